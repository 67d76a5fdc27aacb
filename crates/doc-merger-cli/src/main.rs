//! Document Merger CLI - Command line tool for merging documents into one PDF.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use doc_merger_core::{AppConfig, InputFile, Merger, Paper, SUPPORTED_EXTENSIONS};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaperOption {
    Letter,
    A4,
}

impl From<PaperOption> for Paper {
    fn from(opt: PaperOption) -> Self {
        match opt {
            PaperOption::Letter => Self::Letter,
            PaperOption::A4 => Self::A4,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "doc-merge")]
#[command(author, version, about = "Merge PDF, image, text and DOCX files into one PDF", long_about = None)]
struct Args {
    /// Input files, merged in the order given
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PDF file
    #[arg(short, long, default_value = "merged.pdf")]
    output: PathBuf,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chromium/Chrome executable used to render DOCX files
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Timeout in seconds for rendering one DOCX file
    #[arg(long)]
    render_timeout: Option<u64>,

    /// Paper size for rendered DOCX pages
    #[arg(long, value_enum)]
    paper: Option<PaperOption>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Apply command-line overrides on top of file and environment config.
    fn apply_to(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(ref chrome) = self.chrome {
            config.render.chrome_executable = Some(chrome.clone());
        }
        if let Some(timeout) = self.render_timeout {
            config.render.timeout_seconds = timeout;
        }
        if let Some(paper) = self.paper {
            config.render.paper = paper.into();
        }
        config.validate().context("Invalid configuration")?;
        Ok(())
    }
}

/// Read every input path into memory, keeping the command-line order.
async fn read_inputs(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read input: {}", path.display()))?;
        files.push(InputFile::new(display_name(path), bytes));
    }
    Ok(files)
}

/// File name used in reports and for format detection.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging; RUST_LOG takes precedence over -v
    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},chromiumoxide=warn")));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config, then override with CLI arguments
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    args.apply_to(&mut config)?;

    let files = read_inputs(&args.inputs).await?;
    info!(
        "Merging {} files (supported: {})",
        files.len(),
        SUPPORTED_EXTENSIONS.join(", ")
    );

    let merger = Merger::new(&config);

    // Setup progress bar
    let pb = ProgressBar::new(files.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap()
            .progress_chars("#>-"),
    );

    let progress = pb.clone();
    let result = merger
        .merge_with_progress(
            &files,
            Some(Box::new(move |done, _total| {
                progress.set_position(done as u64);
            })),
        )
        .await;

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            pb.abandon();
            return Err(e).context("Merge failed");
        }
    };

    pb.finish_and_clear();

    tokio::fs::write(&args.output, &output.bytes)
        .await
        .with_context(|| format!("Failed to write output: {}", args.output.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        for file in &output.files {
            println!("  {:<40} {:>5} {:>4} page(s)", file.name, file.format.label(), file.pages);
        }
        println!(
            "Merged {} files ({} pages) into: {}",
            output.files.len(),
            output.page_count,
            args.output.display()
        );
    }

    Ok(())
}
