//! Comparison session controller: load two documents, diff page by page.
//!
//! Phases (load A, load B, compare) run sequentially. Each phase polls a
//! cooperative cancellation flag between per-page work units and reports
//! fractional progress after each page.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::compare::DiffResult;
use crate::compare::diff::diff_pages;
use crate::config::DiffOptions;
use crate::error::Error;
use crate::raster::{DocumentRaster, PageRenderer, RasterPage};

/// Which of the two document slots an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::A => f.write_str("A"),
            Slot::B => f.write_str("B"),
        }
    }
}

/// Cooperative cancellation flag, polled between per-page work units.
///
/// Cancellation is advisory: in-flight page work is allowed to finish, no
/// further pages are started.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Session lifecycle. `Error` is reachable from the loading and comparing
/// states; cancellation returns the session to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    LoadingA,
    LoadingB,
    Comparing,
    Complete,
    Error,
}

/// The aggregate: two document slots, the ordered diff results, and the
/// state of the in-flight phase. Each slot and the result list is owned
/// exclusively by the phase working on it.
pub struct ComparisonSession<R> {
    renderer: R,
    options: DiffOptions,
    state: SessionState,
    slot_a: Option<DocumentRaster>,
    slot_b: Option<DocumentRaster>,
    results: Vec<DiffResult>,
}

impl<R: PageRenderer> ComparisonSession<R> {
    pub fn new(renderer: R, options: DiffOptions) -> Self {
        Self {
            renderer,
            options,
            state: SessionState::Idle,
            slot_a: None,
            slot_b: None,
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn document(&self, slot: Slot) -> Option<&DocumentRaster> {
        match slot {
            Slot::A => self.slot_a.as_ref(),
            Slot::B => self.slot_b.as_ref(),
        }
    }

    /// Diff results produced so far, in increasing page order. The list is
    /// complete only after `compare` has returned `Ok`.
    pub fn results(&self) -> &[DiffResult] {
        &self.results
    }

    /// Hand the result set off to the presentation layer. The diff-image
    /// buffers dominate the session's memory, so callers should take them
    /// rather than clone.
    pub fn take_results(&mut self) -> Vec<DiffResult> {
        std::mem::take(&mut self.results)
    }

    /// Drop both documents and any results.
    pub fn reset(&mut self) {
        self.slot_a = None;
        self.slot_b = None;
        self.results.clear();
        self.state = SessionState::Idle;
    }

    /// Rasterize every page of `bytes` into the named slot, in increasing
    /// page order, reporting progress after each page.
    ///
    /// Replacing a slot invalidates any existing diff results. On error or
    /// cancellation the slot's partial rasters are discarded; the other slot
    /// is never touched.
    pub fn load_document(
        &mut self,
        slot: Slot,
        name: &str,
        bytes: Arc<Vec<u8>>,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(f32, &str),
    ) -> Result<(), Error> {
        self.state = match slot {
            Slot::A => SessionState::LoadingA,
            Slot::B => SessionState::LoadingB,
        };
        self.results.clear();
        *self.slot_mut(slot) = None;

        let byte_len = bytes.len();
        let source = match self.renderer.open(bytes) {
            Ok(source) => source,
            Err(e) => {
                warn!(%slot, name, error = %e, "document failed to open");
                self.state = SessionState::Error;
                return Err(Error::DocumentLoad { slot, source: e });
            }
        };

        let page_count = source.page_count();
        debug!(%slot, name, page_count, scale = self.options.scale, "rasterizing document");

        let mut pages: Vec<RasterPage> = Vec::with_capacity(page_count as usize);
        for page in 1..=page_count {
            if cancel.is_cancelled() {
                debug!(%slot, page, "load cancelled, discarding partial rasters");
                self.state = SessionState::Idle;
                return Err(Error::Cancelled);
            }
            match source.render_page(page, self.options.scale) {
                Ok(raster) => pages.push(raster),
                Err(e) => {
                    warn!(%slot, page, error = %e, "page failed to rasterize");
                    self.state = SessionState::Error;
                    return Err(Error::DocumentLoad { slot, source: e });
                }
            }
            progress(
                page as f32 / page_count as f32 * 100.0,
                &format!("rendered page {page}/{page_count} of {name}"),
            );
        }

        *self.slot_mut(slot) = Some(DocumentRaster {
            name: name.to_owned(),
            byte_len,
            page_count,
            pages,
        });
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Diff every page pair in increasing page order, one result per page
    /// index up to the larger page count.
    ///
    /// Requires both slots loaded. A cancelled run keeps the fully-written
    /// results already produced and returns the session to `Idle`; it is
    /// never marked `Complete`.
    pub fn compare(
        &mut self,
        cancel: &CancelToken,
        progress: &mut dyn FnMut(f32, &str),
    ) -> Result<&[DiffResult], Error> {
        let Some(a) = self.slot_a.as_ref() else {
            return Err(Error::SlotEmpty(Slot::A));
        };
        let Some(b) = self.slot_b.as_ref() else {
            return Err(Error::SlotEmpty(Slot::B));
        };

        self.state = SessionState::Comparing;
        self.results.clear();

        let total = a.page_count.max(b.page_count);
        debug!(
            pages_a = a.page_count,
            pages_b = b.page_count,
            total,
            "comparing documents"
        );

        for page in 1..=total {
            if cancel.is_cancelled() {
                debug!(page, done = self.results.len(), "compare cancelled");
                self.state = SessionState::Idle;
                return Err(Error::Cancelled);
            }
            let result = diff_pages(page, a.page(page), b.page(page), &self.options);
            self.results.push(result);
            progress(
                page as f32 / total as f32 * 100.0,
                &format!("compared page {page}/{total}"),
            );
        }

        self.state = SessionState::Complete;
        Ok(&self.results)
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<DocumentRaster> {
        match slot {
            Slot::A => &mut self.slot_a,
            Slot::B => &mut self.slot_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{PageSource, RenderError};

    /// Interprets the byte source as a tiny fixture format: byte 0 is the
    /// page count, byte 1+i the gray level of page i+1. Pages are 4x4.
    struct FakeRenderer;

    struct FakeDoc {
        grays: Vec<u8>,
    }

    impl PageRenderer for FakeRenderer {
        fn open(&self, bytes: Arc<Vec<u8>>) -> Result<Box<dyn PageSource>, RenderError> {
            let Some((&count, grays)) = bytes.split_first() else {
                return Err(RenderError::Parse("empty fixture".into()));
            };
            if grays.len() != count as usize {
                return Err(RenderError::Parse("truncated fixture".into()));
            }
            Ok(Box::new(FakeDoc {
                grays: grays.to_vec(),
            }))
        }
    }

    impl PageSource for FakeDoc {
        fn page_count(&self) -> u32 {
            self.grays.len() as u32
        }

        fn render_page(&self, page: u32, _scale: f32) -> Result<RasterPage, RenderError> {
            let gray = *page
                .checked_sub(1)
                .and_then(|i| self.grays.get(i as usize))
                .ok_or(RenderError::PageOutOfRange {
                    page,
                    count: self.page_count(),
                })?;
            Ok(RasterPage {
                page_index: page,
                width: 4,
                height: 4,
                pixels: [gray, gray, gray, 255].repeat(16),
            })
        }
    }

    fn doc(grays: &[u8]) -> Arc<Vec<u8>> {
        let mut bytes = vec![grays.len() as u8];
        bytes.extend_from_slice(grays);
        Arc::new(bytes)
    }

    fn session() -> ComparisonSession<FakeRenderer> {
        ComparisonSession::new(FakeRenderer, DiffOptions::default())
    }

    fn ignore(_: f32, _: &str) {}

    #[test]
    fn load_stores_pages_in_order() {
        let mut s = session();
        s.load_document(Slot::A, "a.pdf", doc(&[10, 20, 30]), &CancelToken::new(), &mut ignore)
            .unwrap();

        let raster = s.document(Slot::A).unwrap();
        assert_eq!(raster.page_count, 3);
        assert_eq!(raster.pages.len(), 3);
        let indices: Vec<u32> = raster.pages.iter().map(|p| p.page_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn load_error_leaves_other_slot_intact() {
        let mut s = session();
        s.load_document(Slot::A, "a.pdf", doc(&[10]), &CancelToken::new(), &mut ignore)
            .unwrap();

        let err = s
            .load_document(Slot::B, "b.pdf", Arc::new(Vec::new()), &CancelToken::new(), &mut ignore)
            .unwrap_err();
        assert!(matches!(err, Error::DocumentLoad { slot: Slot::B, .. }));
        assert_eq!(s.state(), SessionState::Error);
        assert!(s.document(Slot::A).is_some());
        assert!(s.document(Slot::B).is_none());
    }

    #[test]
    fn compare_requires_both_slots() {
        let mut s = session();
        assert!(matches!(
            s.compare(&CancelToken::new(), &mut ignore),
            Err(Error::SlotEmpty(Slot::A))
        ));

        s.load_document(Slot::A, "a.pdf", doc(&[10]), &CancelToken::new(), &mut ignore)
            .unwrap();
        assert!(matches!(
            s.compare(&CancelToken::new(), &mut ignore),
            Err(Error::SlotEmpty(Slot::B))
        ));
    }

    #[test]
    fn identical_documents_compare_clean() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[100, 200]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[100, 200]), &cancel, &mut ignore)
            .unwrap();

        let results = s.compare(&cancel, &mut ignore).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.has_difference));
        assert_eq!(s.state(), SessionState::Complete);
    }

    #[test]
    fn differing_page_is_flagged() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[100, 100]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[100, 200]), &cancel, &mut ignore)
            .unwrap();

        let results = s.compare(&cancel, &mut ignore).unwrap();
        assert!(!results[0].has_difference);
        assert!(results[1].has_difference);
        assert_eq!(results[1].difference_percentage, 100.0);
    }

    #[test]
    fn page_count_mismatch_yields_larger_range() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[10, 10, 10]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[10, 10, 10, 10, 10]), &cancel, &mut ignore)
            .unwrap();

        let results = s.compare(&cancel, &mut ignore).unwrap();
        assert_eq!(results.len(), 5);
        let pages: Vec<u32> = results.iter().map(|r| r.page_index).collect();
        assert_eq!(pages, vec![1, 2, 3, 4, 5]);

        for r in &results[3..] {
            assert!(r.has_difference);
            assert_eq!(r.difference_percentage, 100.0);
            assert!(r.diff_image.is_none());
            assert_eq!(r.missing_in, Some(Slot::A));
        }
    }

    #[test]
    fn progress_is_monotonic_and_hits_100_once() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[1, 2, 3, 4]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[1, 2, 3, 4]), &cancel, &mut ignore)
            .unwrap();

        let mut seen: Vec<f32> = Vec::new();
        s.compare(&cancel, &mut |pct, _| seen.push(pct)).unwrap();

        assert_eq!(seen.len(), 4);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100.0);
        assert_eq!(seen.iter().filter(|&&p| p == 100.0).count(), 1);
    }

    #[test]
    fn cancel_mid_compare_keeps_completed_results() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[1, 2, 3, 4, 5]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[1, 2, 3, 4, 5]), &cancel, &mut ignore)
            .unwrap();

        // Cancel after the second page's result is in.
        let flag = cancel.clone();
        let mut events = 0;
        let err = s
            .compare(&cancel, &mut |_, _| {
                events += 1;
                if events == 2 {
                    flag.cancel();
                }
            })
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.results().len(), 2);
    }

    #[test]
    fn cancel_during_load_discards_partial_rasters() {
        let mut s = session();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = s
            .load_document(Slot::A, "a.pdf", doc(&[1, 2, 3]), &cancel, &mut ignore)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.document(Slot::A).is_none());
    }

    #[test]
    fn replacing_a_slot_clears_results() {
        let mut s = session();
        let cancel = CancelToken::new();
        s.load_document(Slot::A, "a.pdf", doc(&[7]), &cancel, &mut ignore)
            .unwrap();
        s.load_document(Slot::B, "b.pdf", doc(&[7]), &cancel, &mut ignore)
            .unwrap();
        s.compare(&cancel, &mut ignore).unwrap();
        assert_eq!(s.results().len(), 1);

        s.load_document(Slot::B, "b2.pdf", doc(&[9]), &cancel, &mut ignore)
            .unwrap();
        assert!(s.results().is_empty());
        assert_eq!(s.state(), SessionState::Idle);
    }
}
