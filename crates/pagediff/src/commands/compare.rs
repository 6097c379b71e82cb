use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::DiffOptions;
use crate::error::Error;
use crate::raster::hayro::HayroRenderer;
use crate::report::terminal;
use crate::session::{CancelToken, ComparisonSession, Slot};
use crate::store;

/// `pagediff compare` — rasterize both documents, diff every page, write
/// artifacts. Returns exit code: 0 = documents match, 1 = any page differs.
pub async fn compare(
    path_a: PathBuf,
    path_b: PathBuf,
    options: DiffOptions,
    out_dir: PathBuf,
    no_images: bool,
) -> Result<i32> {
    let bytes_a = Arc::new(
        std::fs::read(&path_a).with_context(|| format!("Failed to read {}", path_a.display()))?,
    );
    let bytes_b = Arc::new(
        std::fs::read(&path_b).with_context(|| format!("Failed to read {}", path_b.display()))?,
    );
    let name_a = file_name(&path_a);
    let name_b = file_name(&path_b);

    let cancel = CancelToken::new();

    // Ctrl-C flips the cooperative flag; the engine stops at the next page
    // boundary.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let run_start = Instant::now();

    // The engine phases are blocking (parse + rasterize + diff); progress
    // events stream back over a channel.
    let (tx, mut rx) = mpsc::channel::<(f32, String)>(32);
    let engine_cancel = cancel.clone();
    let engine = tokio::task::spawn_blocking(move || {
        let mut session = ComparisonSession::new(HayroRenderer, options);

        let progress_for = |stage: &'static str| {
            let tx = tx.clone();
            move |percent: f32, message: &str| {
                let _ = tx.blocking_send((percent, format!("{stage}: {message}")));
            }
        };

        session.load_document(
            Slot::A,
            &name_a,
            bytes_a,
            &engine_cancel,
            &mut progress_for("load A"),
        )?;
        session.load_document(
            Slot::B,
            &name_b,
            bytes_b,
            &engine_cancel,
            &mut progress_for("load B"),
        )?;
        session.compare(&engine_cancel, &mut progress_for("compare"))?;
        Ok::<_, Error>(session)
    });

    // Drain until the engine drops its channel ends.
    while let Some((percent, message)) = rx.recv().await {
        terminal::show_progress(percent, &message);
    }

    let mut session = match engine.await.context("Engine task panicked")? {
        Ok(session) => session,
        Err(Error::Cancelled) => {
            terminal::clear_line();
            println!("Cancelled.");
            return Ok(130);
        }
        Err(e) => return Err(e.into()),
    };
    let elapsed = run_start.elapsed();

    let document_a = doc_info(&session, Slot::A)?;
    let document_b = doc_info(&session, Slot::B)?;

    let mut results = session.take_results();
    let mut differing = 0usize;
    let mut pages = Vec::with_capacity(results.len());
    for result in &mut results {
        terminal::print_line(result);
        if result.has_difference {
            differing += 1;
        }

        // Diff buffers are the dominant memory cost; take them out of the
        // result as they are consumed.
        let diff_image = match result.diff_image.take() {
            Some(image) if result.has_difference && !no_images => {
                let path = store::write_diff_image(&out_dir, result.page_index, image)?;
                debug!(path = %path.display(), "diff image written");
                Some(store::diff_image_name(result.page_index))
            }
            _ => None,
        };

        pages.push(store::PageRecord {
            page: result.page_index,
            has_difference: result.has_difference,
            difference_percentage: result.difference_percentage,
            diff_image,
            dimension_mismatch: result.dimension_mismatch,
            missing_in: result.missing_in.map(|s| s.to_string()),
        });
    }

    let summary = store::Summary {
        document_a,
        document_b,
        scale: options.scale,
        threshold: options.threshold,
        pages,
    };
    let summary_path = store::write_summary(&out_dir, &summary)?;
    debug!(path = %summary_path.display(), "summary written");

    terminal::print_summary(&results, elapsed);

    Ok(if differing > 0 { 1 } else { 0 })
}

fn doc_info(session: &ComparisonSession<HayroRenderer>, slot: Slot) -> Result<store::DocInfo> {
    let doc = session
        .document(slot)
        .with_context(|| format!("Slot {slot} not loaded"))?;
    Ok(store::DocInfo {
        name: doc.name.clone(),
        bytes: doc.byte_len,
        page_count: doc.page_count,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
