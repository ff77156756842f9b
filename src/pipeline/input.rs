//! Input resolution: validate source files and scan the input directory.
//!
//! We validate the PDF magic bytes (`%PDF`) before handing a path to pdfium
//! so callers get a meaningful error rather than an opaque engine failure,
//! and so obviously-wrong files (a `.pdf`-renamed zip, an HTML error page
//! saved by a download manager) are rejected up front.

use crate::error::BookCleanError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn resolve_pdf(path: &Path) -> Result<PathBuf, BookCleanError> {
    if !path.exists() {
        return Err(BookCleanError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(BookCleanError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BookCleanError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(BookCleanError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Resolved PDF: {}", path.display());
    Ok(path.to_path_buf())
}

/// List the `*.pdf` files in `dir`, sorted by file name.
///
/// Sorting keeps batch order (and therefore log output) stable across runs
/// and file systems. Non-PDF files are ignored silently; an unreadable
/// directory is batch-fatal.
pub fn scan_input_dir(dir: &Path) -> Result<Vec<PathBuf>, BookCleanError> {
    let entries = std::fs::read_dir(dir).map_err(|e| BookCleanError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    pdfs.sort();

    debug!("Found {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// Output file name for a source: `mybook.pdf` → `mybook_cleaned.pdf`.
pub fn cleaned_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    let ext = source
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    format!("{}_cleaned.{}", stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_name_preserves_extension() {
        assert_eq!(
            cleaned_file_name(Path::new("input/mybook.pdf")),
            "mybook_cleaned.pdf"
        );
        assert_eq!(
            cleaned_file_name(Path::new("input/Scan Final (2).PDF")),
            "Scan Final (2)_cleaned.PDF"
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_pdf(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, BookCleanError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04not a pdf").unwrap();
        let err = resolve_pdf(&path).unwrap_err();
        assert!(matches!(err, BookCleanError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.5\n%stub").unwrap();
        assert!(resolve_pdf(&path).is_ok());
    }

    #[test]
    fn scan_returns_sorted_pdfs_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.pdf", "notes.txt", "c.PDF"] {
            std::fs::write(dir.path().join(name), b"%PDF-1.5").unwrap();
        }
        let found = scan_input_dir(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.PDF"]);
    }

    #[test]
    fn scan_missing_dir_fails() {
        let err = scan_input_dir(Path::new("/no/such/dir")).unwrap_err();
        assert!(err.is_batch_fatal());
    }
}
