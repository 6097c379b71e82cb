//! Artifacts handed to the presentation layer: per-page diff PNGs plus a
//! JSON summary manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::Serialize;

use crate::compare::DiffImage;

pub const SUMMARY_FILE: &str = "summary.json";

/// One loaded document, as reported in the summary.
#[derive(Serialize)]
pub struct DocInfo {
    pub name: String,
    pub bytes: usize,
    pub page_count: u32,
}

/// One page's scalar outcome. `diff_image` is the file name of the rendered
/// diff PNG, relative to the output directory, when one was written.
#[derive(Serialize)]
pub struct PageRecord {
    pub page: u32,
    pub has_difference: bool,
    pub difference_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_mismatch: Option<(u32, u32, u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_in: Option<String>,
}

#[derive(Serialize)]
pub struct Summary {
    pub document_a: DocInfo,
    pub document_b: DocInfo,
    pub scale: f32,
    pub threshold: f32,
    pub pages: Vec<PageRecord>,
}

pub fn diff_image_name(page: u32) -> String {
    format!("page-{page:03}.png")
}

/// Encode one page's diff buffer as PNG and write it to the output
/// directory. Consumes the buffer — full-resolution RGBA for every page is
/// the dominant memory cost, so it is not kept around.
pub fn write_diff_image(out_dir: &Path, page: u32, image: DiffImage) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let rgba = RgbaImage::from_raw(image.width, image.height, image.pixels)
        .context("Diff buffer does not match its dimensions")?;
    let mut png = Vec::new();
    rgba.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .context("Failed to encode diff image")?;

    let path = out_dir.join(diff_image_name(page));
    std::fs::write(&path, &png).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn write_summary(out_dir: &Path, summary: &Summary) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let json = serde_json::to_vec_pretty(summary).context("Failed to serialize summary")?;
    let path = out_dir.join(SUMMARY_FILE);
    std::fs::write(&path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_out_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("pagediff_{suffix}_{}_{nanos}", process::id()))
    }

    #[test]
    fn diff_image_round_trips_through_png() {
        let dir = unique_out_dir("png");
        let image = DiffImage {
            width: 3,
            height: 2,
            pixels: [255, 0, 0, 200].repeat(6),
        };
        let path = write_diff_image(&dir, 7, image).expect("write should succeed");
        assert!(path.ends_with("page-007.png"));

        let decoded = image::open(&path).expect("png should decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 200]);

        std::fs::remove_dir_all(&dir).expect("test dir should be removed");
    }

    #[test]
    fn summary_lists_every_page() {
        let dir = unique_out_dir("summary");
        let summary = Summary {
            document_a: DocInfo {
                name: "a.pdf".into(),
                bytes: 10,
                page_count: 2,
            },
            document_b: DocInfo {
                name: "b.pdf".into(),
                bytes: 12,
                page_count: 1,
            },
            scale: 1.5,
            threshold: 15.0,
            pages: vec![
                PageRecord {
                    page: 1,
                    has_difference: false,
                    difference_percentage: 0.0,
                    diff_image: None,
                    dimension_mismatch: None,
                    missing_in: None,
                },
                PageRecord {
                    page: 2,
                    has_difference: true,
                    difference_percentage: 100.0,
                    diff_image: None,
                    dimension_mismatch: None,
                    missing_in: Some("B".into()),
                },
            ],
        };

        let path = write_summary(&dir, &summary).expect("write should succeed");
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["pages"].as_array().unwrap().len(), 2);
        assert_eq!(json["pages"][1]["missing_in"], "B");
        assert!(json["pages"][0].get("missing_in").is_none());

        std::fs::remove_dir_all(&dir).expect("test dir should be removed");
    }
}
