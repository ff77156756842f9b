//! Progress-callback trait for per-book and per-page cleaning events.
//!
//! Inject an [`Arc<dyn CleanProgressCallback>`] via
//! [`crate::config::CleanOptions::progress`] to receive events as the batch
//! driver works through a shelf of books. Callers can forward events to a
//! terminal progress bar, a log file, or a GUI without the library knowing
//! anything about how the host application communicates. All methods have
//! default no-op implementations so callers only override what they care
//! about.

use crate::output::BookReport;
use std::path::Path;
use std::sync::Arc;

/// Called by the batch driver and the per-book pipeline as work progresses.
///
/// Processing is strictly sequential (one file, one page at a time), so
/// implementations never see interleaved events; the `Send + Sync` bound
/// only exists so the callback can be shared behind an `Arc`.
pub trait CleanProgressCallback: Send + Sync {
    /// Called once per book, after the source PDF has been opened.
    fn on_book_start(&self, source: &Path, total_pages: usize) {
        let _ = (source, total_pages);
    }

    /// Called after each source page has been extracted and cleaned.
    fn on_page_processed(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a book's cleaned output has been written.
    fn on_book_complete(&self, source: &Path, report: &BookReport) {
        let _ = (source, report);
    }

    /// Called when a book fails and the batch moves on.
    fn on_book_failed(&self, source: &Path, error: &str) {
        let _ = (source, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CleanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CleanOptions`].
pub type ProgressCallback = Arc<dyn CleanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CleanStats;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        books: AtomicUsize,
        pages: AtomicUsize,
        failures: AtomicUsize,
    }

    impl CleanProgressCallback for TrackingCallback {
        fn on_book_start(&self, _source: &Path, _total_pages: usize) {
            self.books.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_processed(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_book_failed(&self, _source: &Path, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let report = BookReport {
            source: PathBuf::from("a.pdf"),
            output: PathBuf::from("a_cleaned.pdf"),
            title: "A".into(),
            chapters: Vec::new(),
            missing_chapters: Vec::new(),
            stats: CleanStats::default(),
        };
        let cb = NoopProgressCallback;
        cb.on_book_start(Path::new("a.pdf"), 10);
        cb.on_page_processed(1, 10);
        cb.on_book_complete(Path::new("a.pdf"), &report);
        cb.on_book_failed(Path::new("a.pdf"), "corrupt");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            books: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        };

        tracker.on_book_start(Path::new("a.pdf"), 3);
        tracker.on_page_processed(1, 3);
        tracker.on_page_processed(2, 3);
        tracker.on_book_failed(Path::new("b.pdf"), "no chapters");

        assert_eq!(tracker.books.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_book_start(Path::new("x.pdf"), 5);
        cb.on_page_processed(1, 5);
    }
}
