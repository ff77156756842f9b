//! CLI binary for pdf-bookclean.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `CleanOptions`, drives the batch, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_bookclean::{
    analyze_batch, process_batch, BookReport, CleanOptions, CleanProgressCallback,
    ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar, reset for each book in the batch, with a
/// per-book result line printed above it as books finish.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl CleanProgressCallback for CliProgressCallback {
    fn on_book_start(&self, source: &Path, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(Self::file_name(source));
    }

    fn on_page_processed(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_position(page_num as u64);
    }

    fn on_book_complete(&self, source: &Path, report: &BookReport) {
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            Self::file_name(source),
            dim(&format!(
                "{} chapters, {} pages out",
                report.chapters.len(),
                report.stats.output_pages
            )),
            dim(&format!(
                "{} footnote markers removed",
                report.stats.footnote_markers_removed
            )),
        ));
    }

    fn on_book_failed(&self, source: &Path, error: &str) {
        // Keep only the first line; multi-line hints belong in the logs.
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            Self::file_name(source),
            red(first_line),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean every PDF in ./input using configs from ./configs
  bookclean

  # Explicit directories
  bookclean --input-dir scans --config-dir configs --output-dir clean

  # Generate starter configs from each book's printed table of contents
  bookclean --analyze

  # Machine-readable batch summary
  bookclean --json > summary.json

CONFIG FORMAT (one JSON file per book in --config-dir):
  {
    "metadata": { "title": "...", "author": "...", "filename_pattern": "..." },
    "settings": { "toc_end_page": 8 },
    "chapters": [
      { "part": "Front",  "num": "0", "title": "Preface", "special_type": "preface" },
      { "part": "Part 1", "num": "1", "title": "FIRST CHAPTER TITLE" }
    ]
  }

  Configs are matched to PDFs by substring: a config applies to every input
  file whose name contains its filename_pattern.

OUTPUT:
  For each input book.pdf:
    book_cleaned.pdf    cleaned, linearly paginated PDF
    book_cleaned.txt    cleaned plain text           (unless --no-sidecars)
    book_cleaned.json   chapter index into the text  (unless --no-sidecars)

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory containing the pdfium shared library
  RUST_LOG          Tracing filter (overrides -v/-q defaults)
"#;

/// Clean PDF books for text-to-speech ingestion.
#[derive(Parser, Debug)]
#[command(
    name = "bookclean",
    version,
    about = "Clean PDF books for text-to-speech: strip footnotes, headers and page numbers, regenerate front matter",
    long_about = "Scan a directory of PDF books, match each against a declarative JSON chapter \
config, strip footnote markers, citations, running headers and page numbers from the text, \
and write a cleaned, linearly paginated PDF with a generated title page and table of contents.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory scanned for source PDFs.
    #[arg(long, alias = "input_dir", env = "BOOKCLEAN_INPUT_DIR", default_value = "input")]
    input_dir: PathBuf,

    /// Directory for cleaned output files.
    #[arg(long, alias = "output_dir", env = "BOOKCLEAN_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Directory holding per-book JSON configs.
    #[arg(long, alias = "config_dir", env = "BOOKCLEAN_CONFIG_DIR", default_value = "configs")]
    config_dir: PathBuf,

    /// PDF user password for encrypted sources.
    #[arg(long, env = "BOOKCLEAN_PASSWORD")]
    password: Option<String>,

    /// Parse each book's printed table of contents into a starter config
    /// (written to --config-dir) instead of cleaning.
    #[arg(long)]
    analyze: bool,

    /// Skip the _cleaned.txt / _cleaned.json sidecar files.
    #[arg(long)]
    no_sidecars: bool,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "BOOKCLEAN_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "BOOKCLEAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOOKCLEAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BOOKCLEAN_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar and its per-book lines are the user-facing feedback.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Analyze mode ─────────────────────────────────────────────────────
    if cli.analyze {
        let generated = analyze_batch(&cli.input_dir, &cli.config_dir, cli.password.as_deref())
            .context("Config analysis failed")?;

        if cli.json {
            let rows: Vec<serde_json::Value> = generated
                .iter()
                .map(|(path, chapters)| {
                    serde_json::json!({ "config": path, "chapters": chapters })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("Failed to serialise summary")?
            );
        } else if !cli.quiet {
            for (path, chapters) in &generated {
                eprintln!(
                    "  {} {}  {}",
                    green("✓"),
                    path.display(),
                    dim(&format!("{chapters} chapters"))
                );
            }
            eprintln!(
                "{} {} config(s) generated into {}",
                green("✔"),
                bold(&generated.len().to_string()),
                cli.config_dir.display()
            );
        }
        return Ok(());
    }

    // ── Build options ────────────────────────────────────────────────────
    let mut options = CleanOptions::default().write_sidecars(!cli.no_sidecars);
    if let Some(password) = cli.password.clone() {
        options = options.password(password);
    }

    let progress_cb = if show_progress {
        let cb = CliProgressCallback::new();
        options = options.progress(Arc::clone(&cb) as ProgressCallback);
        Some(cb)
    } else {
        None
    };

    // ── Run the batch ────────────────────────────────────────────────────
    let summary = process_batch(&cli.input_dir, &cli.output_dir, &cli.config_dir, &options)
        .context("Batch processing failed")?;

    if let Some(cb) = progress_cb {
        cb.bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
        return Ok(());
    }

    if !cli.quiet {
        // Without the live callback, print the per-book lines now.
        if !show_progress {
            for report in &summary.reports {
                eprintln!(
                    "  {} {}  {}",
                    green("✓"),
                    report.output.display(),
                    dim(&format!(
                        "{} footnote markers removed",
                        report.stats.footnote_markers_removed
                    )),
                );
            }
            for failure in &summary.failures {
                let first_line = failure.error.lines().next().unwrap_or(&failure.error);
                eprintln!(
                    "  {} {}  {}",
                    red("✗"),
                    failure.source.display(),
                    red(first_line)
                );
            }
        }

        let cleaned = summary.reports.len();
        let failed = summary.failures.len();
        eprintln!(
            "{} {}/{} book(s) cleaned  {}  →  {}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&cleaned.to_string()),
            cleaned + failed,
            dim(&format!(
                "{} footnote markers removed",
                summary.total_footnote_markers()
            )),
            bold(&cli.output_dir.display().to_string()),
        );
    }

    Ok(())
}
