//! Perceptually weighted pixel diff between two rasterized pages.
//!
//! Raw RGB distance overweights blue and underweights green relative to
//! perceived brightness, so channel deltas are combined with luma weights
//! before thresholding. Runs synchronously with no error conditions: absent
//! pages are handled as data, not exceptions.

use crate::config::DiffOptions;
use crate::raster::RasterPage;
use crate::session::Slot;

use super::{DiffImage, DiffResult};

/// Highlight colour for differing pixels; alpha scales with the delta.
const DIFF_RED: [u8; 3] = [255, 0, 0];
/// Minimum alpha for a flagged pixel, so faint differences stay visible.
const DIFF_ALPHA_MIN: f32 = 150.0;
/// Alpha for unchanged (averaged) pixels: visible but muted.
const FADE_ALPHA: u8 = 80;
/// Fill for areas present in only one page, to flag a size/layout change
/// as distinct from a content change.
const EXTRA_BLUE: [u8; 4] = [0, 0, 255, 150];

/// Compare one page pair.
///
/// Either side may be absent (one document ran out of pages); that is a full
/// difference with no visualization. Otherwise the overlap rectangle is
/// diffed pixel by pixel and the extra area of the larger page is painted
/// blue. The percentage is computed over the overlap only, and is 0 when the
/// overlap is empty.
pub fn diff_pages(
    page_index: u32,
    a: Option<&RasterPage>,
    b: Option<&RasterPage>,
    options: &DiffOptions,
) -> DiffResult {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        (a, _) => {
            let missing = if a.is_none() { Slot::A } else { Slot::B };
            return DiffResult {
                page_index,
                has_difference: true,
                difference_percentage: 100.0,
                diff_image: None,
                dimension_mismatch: None,
                missing_in: Some(missing),
            };
        }
    };

    let overlap_w = a.width.min(b.width);
    let overlap_h = a.height.min(b.height);
    let max_w = a.width.max(b.width);
    let max_h = a.height.max(b.height);

    let weights = options.weights;
    let mut out = vec![0u8; max_w as usize * max_h as usize * 4];
    let mut differing: u64 = 0;

    for y in 0..max_h {
        for x in 0..max_w {
            let o = (y as usize * max_w as usize + x as usize) * 4;
            if x >= overlap_w || y >= overlap_h {
                out[o..o + 4].copy_from_slice(&EXTRA_BLUE);
                continue;
            }

            // Each input is indexed by its own width, not the output width.
            let ia = (y as usize * a.width as usize + x as usize) * 4;
            let ib = (y as usize * b.width as usize + x as usize) * 4;

            let delta = weights.r * (a.pixels[ia] as f32 - b.pixels[ib] as f32).abs()
                + weights.g * (a.pixels[ia + 1] as f32 - b.pixels[ib + 1] as f32).abs()
                + weights.b * (a.pixels[ia + 2] as f32 - b.pixels[ib + 2] as f32).abs();

            if delta > options.threshold {
                differing += 1;
                let alpha = (delta * 2.0).round().clamp(DIFF_ALPHA_MIN, 255.0) as u8;
                out[o..o + 4].copy_from_slice(&[DIFF_RED[0], DIFF_RED[1], DIFF_RED[2], alpha]);
            } else {
                out[o] = avg(a.pixels[ia], b.pixels[ib]);
                out[o + 1] = avg(a.pixels[ia + 1], b.pixels[ib + 1]);
                out[o + 2] = avg(a.pixels[ia + 2], b.pixels[ib + 2]);
                out[o + 3] = FADE_ALPHA;
            }
        }
    }

    let overlap_area = overlap_w as u64 * overlap_h as u64;
    let difference_percentage = if overlap_area == 0 {
        0.0
    } else {
        differing as f64 / overlap_area as f64 * 100.0
    };

    let dimension_mismatch = ((a.width, a.height) != (b.width, b.height))
        .then_some((a.width, a.height, b.width, b.height));

    DiffResult {
        page_index,
        has_difference: differing > 0 || dimension_mismatch.is_some(),
        difference_percentage,
        diff_image: Some(DiffImage {
            width: max_w,
            height: max_h,
            pixels: out,
        }),
        dimension_mismatch,
        missing_in: None,
    }
}

fn avg(x: u8, y: u8) -> u8 {
    ((x as u16 + y as u16) / 2) as u8
}
