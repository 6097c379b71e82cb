//! Engine options: fixed render scale, noise threshold, channel weights.
//!
//! Merge order is CLI > env > file > defaults. The file layer is an optional
//! `pagediff.toml` in the working directory.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "pagediff.toml";

/// Per-channel weights approximating human luminance sensitivity: green
/// dominates, blue barely registers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChannelWeights {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            r: 0.30,
            g: 0.59,
            b: 0.11,
        }
    }
}

/// Diff engine configuration.
///
/// The defaults are empirically derived, not hard invariants: threshold 15 on
/// the weighted 8-bit scale absorbs anti-aliasing and compression noise while
/// catching real content changes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Render scale applied to every page of both documents. Fixed per
    /// session so pixel-for-pixel comparison is meaningful.
    pub scale: f32,
    /// Noise floor for the weighted per-pixel delta. A delta exactly at the
    /// threshold does not count as different.
    pub threshold: f32,
    pub weights: ChannelWeights,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            scale: 1.5,
            threshold: 15.0,
            weights: ChannelWeights::default(),
        }
    }
}

impl DiffOptions {
    /// Validate semantic constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            bail!("scale must be a positive finite value, got {}", self.scale);
        }
        if !(0.0..=255.0).contains(&self.threshold) {
            bail!("threshold must be between 0 and 255, got {}", self.threshold);
        }
        for (name, v) in [
            ("r", self.weights.r),
            ("g", self.weights.g),
            ("b", self.weights.b),
        ] {
            if !v.is_finite() || v < 0.0 {
                bail!("weight {name} must be non-negative, got {v}");
            }
        }
        Ok(())
    }
}

/// Values extracted from the CLI that participate in the merge.
pub struct CliOverrides {
    pub scale: Option<f32>,
    pub threshold: Option<f32>,
}

/// Resolve options from all layers, highest priority last applied.
pub fn resolve(cli: CliOverrides) -> Result<DiffOptions> {
    // 1. File layer (optional)
    let mut options = match std::fs::read_to_string(CONFIG_FILE) {
        Ok(content) => toml::from_str(&content)
            .with_context(|| format!("Failed to parse {CONFIG_FILE}"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => DiffOptions::default(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {CONFIG_FILE}")),
    };

    // 2. Env layer
    if let Some(scale) = env_f32("PAGEDIFF_SCALE")? {
        options.scale = scale;
    }
    if let Some(threshold) = env_f32("PAGEDIFF_THRESHOLD")? {
        options.threshold = threshold;
    }

    // 3. CLI layer
    if let Some(scale) = cli.scale {
        options.scale = scale;
    }
    if let Some(threshold) = cli.threshold {
        options.threshold = threshold;
    }

    options.validate()?;
    Ok(options)
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    std::env::var(key)
        .ok()
        .map(|v| v.parse::<f32>())
        .transpose()
        .with_context(|| format!("{key} must be a valid float"))
}
