use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_CONFIG_PATH: &str = "ASSIGNMENT_ROUTER_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_ROUTER_MODEL: &str = "gemini-2.0-flash-lite";
const DEFAULT_PASSTHROUGH_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Which answering strategy the `/api/` endpoint uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerMode {
    /// Classify the question and run a dedicated handler
    #[default]
    Router,
    /// Forward the question and file straight to the model
    Passthrough,
}

impl AnswerMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "router" => Some(Self::Router),
            "passthrough" => Some(Self::Passthrough),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Passthrough => "passthrough",
        }
    }
}

/// Tunables for the category handlers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Base URL used for httpie-style requests (overridable for tests)
    pub httpbin_base_url: String,
    /// Prettier version passed to `npx`
    pub prettier_version: String,
    /// Compressed images must be strictly below this many bytes to qualify
    pub image_size_threshold: usize,
    /// Repository name prefix for pushed images (`<user>/<prefix>-<tag>`)
    pub docker_repository_prefix: String,
    /// Image tag used when the question carries no digits at all
    pub default_image_tag: String,
    /// Root for per-request scratch directories. Defaults to the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
    /// Upper bound on any single multipart field, in bytes
    pub max_upload_bytes: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            httpbin_base_url: "https://httpbin.org".to_string(),
            prettier_version: "3.4.2".to_string(),
            image_size_threshold: 1500,
            docker_repository_prefix: "tds-assignment".to_string(),
            default_image_tag: "22f3002248".to_string(),
            scratch_dir: None,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Credentials used by the image push handler
#[derive(Clone, Default)]
pub struct DockerCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DockerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Generative API settings
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub router_model: String,
    pub passthrough_model: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            router_model: DEFAULT_ROUTER_MODEL.to_string(),
            passthrough_model: DEFAULT_PASSTHROUGH_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("router_model", &self.router_model)
            .field("passthrough_model", &self.passthrough_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub handlers: HandlerConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: AnswerMode,
    pub llm: LlmConfig,
    pub docker: DockerCredentials,
    pub handlers: HandlerConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: AnswerMode::default(),
            llm: LlmConfig::default(),
            docker: DockerCredentials::default(),
            handlers: HandlerConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let mode = match std::env::var("ANSWER_MODE") {
            Ok(raw) => AnswerMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown ANSWER_MODE, falling back to router");
                AnswerMode::Router
            }),
            Err(_) => AnswerMode::default(),
        };

        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let defaults = LlmConfig::default();
        let llm = LlmConfig {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            router_model: std::env::var("ROUTER_MODEL").unwrap_or(defaults.router_model),
            passthrough_model: std::env::var("PASSTHROUGH_MODEL")
                .unwrap_or(defaults.passthrough_model),
            timeout: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        let docker = DockerCredentials {
            username: std::env::var("DOCKER_USERNAME")
                .unwrap_or_else(|_| "default_username".to_string()),
            password: std::env::var("DOCKER_PASSWORD")
                .unwrap_or_else(|_| "default_password".to_string()),
        };

        let config_path = std::env::var(ENV_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let handlers = Self::load_config_file(&config_path)
            .map(|cf| cf.handlers)
            .unwrap_or_default();

        Self {
            mode,
            llm,
            docker,
            handlers,
            port,
            host,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse_config_file(path, &contents),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    fn parse_config_file(path: &Path, contents: &str) -> Option<ConfigFile> {
        let contents = contents.trim();
        if contents.is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Some(ConfigFile::default());
        }

        match serde_yaml::from_str(contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded configuration from file");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
