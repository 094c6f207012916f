//! Lossy-to-lossless PNG shrinking under a byte budget
//!
//! Strategies are tried in a fixed order; the first one strictly under the
//! threshold wins, otherwise the smallest output overall.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, BiLevel, ColorMap, FilterType};
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, Rgb, RgbImage};
use serde::Serialize;
use serde_json::json;

use super::{HandlerContext, HandlerError, HandlerResult, blocking};
use crate::model::Answer;

const THUMBNAIL_EDGE: u32 = 10;
const PALETTE_ITERATIONS: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct Compressed {
    pub method: &'static str,
    pub size: usize,
    #[serde(skip)]
    pub png: Vec<u8>,
}

fn encode_png(bytes: &[u8], width: u32, height: u32, color: ColorType) -> Result<Vec<u8>, HandlerError> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive)
        .write_image(bytes, width, height, color)?;
    Ok(out)
}

fn encode_dynamic(img: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let rgba = img.to_rgba8();
            encode_png(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        }
        _ => encode_png(img.as_bytes(), img.width(), img.height(), img.color()),
    }
}

/// Two colours picked by k-means over the image's pixels
#[derive(Debug, Clone, Copy)]
struct TwoColorPalette([Rgb<u8>; 2]);

fn luma(p: &Rgb<u8>) -> u32 {
    (299 * p[0] as u32 + 587 * p[1] as u32 + 114 * p[2] as u32) / 1000
}

fn distance(a: &Rgb<u8>, b: &Rgb<u8>) -> u32 {
    (0..3)
        .map(|i| {
            let d = a[i] as i32 - b[i] as i32;
            (d * d) as u32
        })
        .sum()
}

impl TwoColorPalette {
    fn adaptive(img: &RgbImage) -> Self {
        let (Some(dark), Some(light)) = (
            img.pixels().min_by_key(|p| luma(p)),
            img.pixels().max_by_key(|p| luma(p)),
        ) else {
            return Self([Rgb([0, 0, 0]), Rgb([255, 255, 255])]);
        };
        let mut centers = [*dark, *light];

        for _ in 0..PALETTE_ITERATIONS {
            let mut sums = [[0u64; 3]; 2];
            let mut counts = [0u64; 2];
            for p in img.pixels() {
                let k = usize::from(distance(p, &centers[1]) < distance(p, &centers[0]));
                for c in 0..3 {
                    sums[k][c] += p[c] as u64;
                }
                counts[k] += 1;
            }
            let mut next = centers;
            for k in 0..2 {
                if counts[k] > 0 {
                    next[k] = Rgb([0usize, 1, 2].map(|c| (sums[k][c] / counts[k]) as u8));
                }
            }
            if next == centers {
                break;
            }
            centers = next;
        }
        Self(centers)
    }
}

impl ColorMap for TwoColorPalette {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        usize::from(distance(color, &self.0[1]) < distance(color, &self.0[0]))
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        *color = self.0[self.index_of(color)];
    }
}

fn dithered_palette(img: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    let mut rgb = img.to_rgb8();
    let palette = TwoColorPalette::adaptive(&rgb);
    imageops::dither(&mut rgb, &palette);
    encode_png(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
}

fn black_and_white(img: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    let mut gray = img.to_luma8();
    imageops::dither(&mut gray, &BiLevel);
    encode_png(gray.as_raw(), gray.width(), gray.height(), ColorType::L8)
}

fn tiny_resize(img: &DynamicImage) -> Result<Vec<u8>, HandlerError> {
    let (width, height) = img.dimensions();
    if width <= THUMBNAIL_EDGE && height <= THUMBNAIL_EDGE {
        return encode_dynamic(img);
    }
    encode_dynamic(&img.resize(THUMBNAIL_EDGE, THUMBNAIL_EDGE, FilterType::Lanczos3))
}

/// Run every strategy, in order
pub fn compress_all(img: &DynamicImage) -> Result<Vec<Compressed>, HandlerError> {
    let strategies: [(&'static str, fn(&DynamicImage) -> Result<Vec<u8>, HandlerError>); 4] = [
        ("Dithered 2-Color Palette", dithered_palette),
        ("Black and White", black_and_white),
        ("Minimal PNG", encode_dynamic),
        ("Tiny Resize", tiny_resize),
    ];

    strategies
        .into_iter()
        .map(|(method, run)| {
            let png = run(img)?;
            Ok(Compressed {
                method,
                size: png.len(),
                png,
            })
        })
        .collect()
}

/// First result with `0 < size < threshold`, else the smallest
pub fn select(results: &[Compressed], threshold: usize) -> Option<&Compressed> {
    results
        .iter()
        .find(|c| c.size > 0 && c.size < threshold)
        .or_else(|| results.iter().min_by_key(|c| c.size))
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_file()?;
    let bytes = file.read().await?;
    let original_size = bytes.len();
    let threshold = ctx.settings.image_size_threshold;

    let results = blocking(move || {
        let img = image::load_from_memory(&bytes)?;
        compress_all(&img)
    })
    .await?;

    let best = select(&results, threshold)
        .ok_or_else(|| HandlerError::Internal("No compression strategy produced output".into()))?;

    tracing::debug!(
        method = best.method,
        size = best.size,
        original_size,
        threshold,
        "Selected compressed image"
    );

    Ok(Answer::new(BASE64.encode(&best.png))
        .with("compressed_size", best.size)
        .with("compression_method", best.method)
        .with(
            "debug_info",
            json!({
                "original_size": original_size,
                "compression_strategies": results,
            }),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;
    use crate::service::handlers::testing::Fixture;
    use std::io::Cursor;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn gradient_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn sized(method: &'static str, size: usize) -> Compressed {
        Compressed {
            method,
            size,
            png: vec![0; size],
        }
    }

    #[test]
    fn test_select_prefers_first_under_threshold() {
        let results = [sized("a", 2000), sized("b", 900), sized("c", 100)];
        assert_eq!(select(&results, 1500).unwrap().method, "b");
        assert_eq!(select(&results, 50).unwrap().method, "c");
        assert!(select(&[], 1500).is_none());
    }

    #[test]
    fn test_palette_has_two_colors() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 { Rgb([10, 20, 30]) } else { Rgb([200, 210, 220]) }
        }));
        let mut rgb = img.to_rgb8();
        let palette = TwoColorPalette::adaptive(&rgb);
        imageops::dither(&mut rgb, &palette);

        let mut colors: Vec<Rgb<u8>> = rgb.pixels().copied().collect();
        colors.sort_by_key(luma);
        colors.dedup();
        assert_eq!(colors, vec![Rgb([10, 20, 30]), Rgb([200, 210, 220])]);
    }

    #[test]
    fn test_compress_all_outputs_pngs_in_order() {
        let img = image::load_from_memory(&gradient_png(40, 20)).unwrap();
        let results = compress_all(&img).unwrap();

        let methods: Vec<&str> = results.iter().map(|c| c.method).collect();
        assert_eq!(
            methods,
            ["Dithered 2-Color Palette", "Black and White", "Minimal PNG", "Tiny Resize"]
        );
        for c in &results {
            assert!(c.png.starts_with(PNG_SIGNATURE));
        }

        let thumb = image::load_from_memory(&results[3].png).unwrap();
        assert_eq!(thumb.dimensions(), (10, 5));
    }

    #[tokio::test]
    async fn test_handle_with_generous_threshold_picks_first_strategy() {
        let mut fixture = Fixture::new(&[]);
        fixture.settings.image_size_threshold = usize::MAX;
        let fixture = fixture.with_upload("shapes.png", &gradient_png(32, 32)).await;

        let answer = handle(&fixture.context("Compress losslessly")).await.unwrap();

        assert_eq!(answer.details["compression_method"], "Dithered 2-Color Palette");
        let png = BASE64.decode(answer.answer.as_str().unwrap()).unwrap();
        assert_eq!(png.len() as u64, answer.details["compressed_size"].as_u64().unwrap());
        assert_eq!(
            answer.details["debug_info"]["compression_strategies"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[tokio::test]
    async fn test_handle_with_tiny_threshold_picks_smallest() {
        let mut fixture = Fixture::new(&[]);
        fixture.settings.image_size_threshold = 1;
        let fixture = fixture.with_upload("shapes.png", &gradient_png(32, 32)).await;

        let answer = handle(&fixture.context("Compress")).await.unwrap();

        let strategies = answer.details["debug_info"]["compression_strategies"]
            .as_array()
            .unwrap();
        let smallest = strategies
            .iter()
            .map(|s| s["size"].as_u64().unwrap())
            .min()
            .unwrap();
        assert_eq!(answer.details["compressed_size"].as_u64().unwrap(), smallest);
    }

    #[tokio::test]
    async fn test_not_an_image_is_input_error() {
        let fixture = Fixture::new(&[]).with_upload("notes.png", b"plain text").await;
        let err = handle(&fixture.context("Compress")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
