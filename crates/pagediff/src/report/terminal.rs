use std::io::Write;
use std::time::Duration;

use crate::compare::DiffResult;
use crate::session::Slot;

/// Clear the current terminal line (wipes the progress indicator).
pub fn clear_line() {
    print!("\r\x1b[2K");
}

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// In-place progress indicator for the in-flight phase.
pub fn show_progress(percent: f32, message: &str) {
    if percent < 100.0 {
        print!("\r\x1b[2K  {message}  [{percent:>3.0}%]");
        let _ = std::io::stdout().flush();
    }
}

/// Print a single page result line.
pub fn print_line(result: &DiffResult) {
    clear_line();
    let page = result.page_index;

    if let Some(missing) = result.missing_in {
        let present = match missing {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        };
        println!("  \x1b[33mONLY\x1b[0m  page {page}  (only in document {present})");
    } else if let Some((w1, h1, w2, h2)) = result.dimension_mismatch {
        println!(
            "  \x1b[31mSIZE\x1b[0m  page {page}  ({w1}x{h1} -> {w2}x{h2}, {:.2}% of overlap differs)",
            result.difference_percentage
        );
    } else if result.has_difference {
        println!(
            "  \x1b[31mDIFF\x1b[0m  page {page}  ({:.2}% of pixels)",
            result.difference_percentage
        );
    } else {
        println!("  \x1b[32mSAME\x1b[0m  page {page}");
    }
}

/// Print the final summary.
pub fn print_summary(results: &[DiffResult], elapsed: Duration) {
    let total = results.len();
    let differing = results.iter().filter(|r| r.has_difference).count();
    let identical = total - differing;

    clear_line();
    println!();
    println!(
        "Pages:  {total} total, \x1b[32m{identical} identical\x1b[0m, \x1b[31m{differing} differing\x1b[0m"
    );
    println!("Time:   {}", format_duration(elapsed));

    if differing > 0 {
        println!();
        println!("{differing} page(s) have visual differences.");
    }
}
