use std::path::PathBuf;

use clap::{Parser, Subcommand};

fn parse_threshold(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=255.0).contains(&v) {
        return Err(format!("threshold must be between 0 and 255, got {v}"));
    }
    Ok(v)
}

fn parse_scale(s: &str) -> Result<f32, String> {
    let v: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("scale must be a positive finite value, got {v}"));
    }
    Ok(v)
}

#[derive(Parser)]
#[command(
    name = "pagediff",
    about = "Pixel-level comparison of paginated documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Rasterize two documents, diff every page, and report differences (exit 0/1)
    Compare {
        /// First document (slot A)
        a: PathBuf,
        /// Second document (slot B)
        b: PathBuf,
        /// Render scale applied to both documents (overrides config)
        #[arg(long, value_parser = parse_scale)]
        scale: Option<f32>,
        /// Noise threshold for the weighted per-pixel delta (overrides config)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f32>,
        /// Directory for diff images and the JSON summary
        #[arg(long, default_value = "pagediff-out")]
        out_dir: PathBuf,
        /// Skip writing diff images (summary and terminal report only)
        #[arg(long)]
        no_images: bool,
    },
}
