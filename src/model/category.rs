//! Closed set of question categories the classifier may assign

use serde::Serialize;

/// Question category. Each variant maps to exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    ZipCsvExtract,
    JsonSort,
    MultiCursorJson,
    UnicodeDataProcessing,
    FileComparison,
    ExcelFormulaProcessing,
    GeneralProcessing,
    Unknown,
    DateRangeCalculation,
    HttpieRequest,
    NpxPrettierSha256,
    GoogleSheetsFormula,
    FileReplacementSha256,
    FileAttributesListing,
    SqlSalesCalculation,
    MarkdownDocumentation,
    ImageCompression,
    DockerImagePush,
    CliCommandSimulation,
    FileMoveRenameHash,
}

impl Category {
    /// Every category, in the order they are listed to the model
    pub const ALL: [Category; 20] = [
        Category::ZipCsvExtract,
        Category::JsonSort,
        Category::MultiCursorJson,
        Category::UnicodeDataProcessing,
        Category::FileComparison,
        Category::ExcelFormulaProcessing,
        Category::GeneralProcessing,
        Category::Unknown,
        Category::DateRangeCalculation,
        Category::HttpieRequest,
        Category::NpxPrettierSha256,
        Category::GoogleSheetsFormula,
        Category::FileReplacementSha256,
        Category::FileAttributesListing,
        Category::SqlSalesCalculation,
        Category::MarkdownDocumentation,
        Category::ImageCompression,
        Category::DockerImagePush,
        Category::CliCommandSimulation,
        Category::FileMoveRenameHash,
    ];

    /// Wire label, as the model is asked to reply
    pub fn label(&self) -> &'static str {
        match self {
            Category::ZipCsvExtract => "ZIP_CSV_EXTRACT",
            Category::JsonSort => "JSON_SORT",
            Category::MultiCursorJson => "MULTI_CURSOR_JSON",
            Category::UnicodeDataProcessing => "UNICODE_DATA_PROCESSING",
            Category::FileComparison => "FILE_COMPARISON",
            Category::ExcelFormulaProcessing => "EXCEL_FORMULA_PROCESSING",
            Category::GeneralProcessing => "GENERAL_PROCESSING",
            Category::Unknown => "UNKNOWN",
            Category::DateRangeCalculation => "DATE_RANGE_CALCULATION",
            Category::HttpieRequest => "HTTPIE_REQUEST",
            Category::NpxPrettierSha256 => "NPX_PRETTIER_SHA256",
            Category::GoogleSheetsFormula => "GOOGLE_SHEETS_FORMULA",
            Category::FileReplacementSha256 => "FILE_REPLACEMENT_SHA256",
            Category::FileAttributesListing => "FILE_ATTRIBUTES_LISTING",
            Category::SqlSalesCalculation => "SQL_SALES_CALCULATION",
            Category::MarkdownDocumentation => "MARKDOWN_DOCUMENTATION",
            Category::ImageCompression => "IMAGE_COMPRESSION",
            Category::DockerImagePush => "DOCKER_IMAGE_PUSH",
            Category::CliCommandSimulation => "CLI_COMMAND_SIMULATION",
            Category::FileMoveRenameHash => "FILE_MOVE_RENAME_HASH",
        }
    }

    /// One-line description shown to the model in the classification prompt
    pub fn description(&self) -> &'static str {
        match self {
            Category::ZipCsvExtract => {
                "Questions involving extracting data from a ZIP file containing a CSV"
            }
            Category::JsonSort => "Questions requiring sorting of JSON data",
            Category::MultiCursorJson => "Questions about converting multi-cursor text to JSON",
            Category::UnicodeDataProcessing => {
                "Questions involving processing files with multiple encodings"
            }
            Category::FileComparison => "Questions about comparing contents of files",
            Category::ExcelFormulaProcessing => "Questions about Excel formulas",
            Category::GeneralProcessing => {
                "Questions that require general text or file analysis"
            }
            Category::Unknown => "Cannot determine the specific processing type",
            Category::DateRangeCalculation => {
                "Questions about counting days in a specific date range"
            }
            Category::HttpieRequest => "Specific httpie request to httpbin.org",
            Category::NpxPrettierSha256 => "Tasks involving npx, prettier, and SHA256 hash",
            Category::GoogleSheetsFormula => "Tasks involving Google Sheets specific formulas",
            Category::FileReplacementSha256 => {
                "Tasks involving file text replacement and SHA256 generation"
            }
            Category::FileAttributesListing => {
                "Tasks involving file attributes, size, and timestamp analysis"
            }
            Category::SqlSalesCalculation => {
                "Tasks involving SQL database analysis and sales calculation"
            }
            Category::MarkdownDocumentation => {
                "Tasks involving creating structured Markdown documentation"
            }
            Category::ImageCompression => "Tasks involving lossless image compression",
            Category::DockerImagePush => {
                "Tasks involving creating, tagging, and pushing Docker images"
            }
            Category::CliCommandSimulation => {
                "Questions about simulating CLI command outputs"
            }
            Category::FileMoveRenameHash => {
                "Moving files out of subdirectories, renaming digits, and hashing the result"
            }
        }
    }

    /// Exact (case-sensitive) label lookup
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
