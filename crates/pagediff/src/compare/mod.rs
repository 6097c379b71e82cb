pub mod diff;

use crate::session::Slot;

/// A composed diff-visualization buffer. Always sized to the maximum width
/// and height of the two input pages.
#[derive(Debug, Clone)]
pub struct DiffImage {
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, `width * height * 4`, row-major.
    pub pixels: Vec<u8>,
}

/// Outcome of comparing one page pair.
#[derive(Debug)]
pub struct DiffResult {
    /// 1-based page number being compared.
    pub page_index: u32,
    /// True if any overlap pixel exceeded the threshold, or the raster
    /// dimensions differ, or only one document has this page.
    pub has_difference: bool,
    /// Percent of overlap-region pixels flagged as different, in `[0, 100]`.
    /// Extra-area pixels never enter the percentage.
    pub difference_percentage: f64,
    /// Present whenever both input pages existed.
    pub diff_image: Option<DiffImage>,
    /// `Some((w_a, h_a, w_b, h_b))` when the raster dimensions differ.
    pub dimension_mismatch: Option<(u32, u32, u32, u32)>,
    /// Set when only one document has this page; names the slot missing it.
    pub missing_in: Option<Slot>,
}
