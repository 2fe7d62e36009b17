use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::outline::{outline_for_file, title_for, write_outline};
use crate::prelude::{println, *};
use crate::settings::Settings;

#[derive(Debug, clap::Args)]
#[command(about = "Write an outline JSON file for every PDF of a directory")]
pub struct App {
    /// Directory containing the PDF files (defaults to `paths.input`)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the JSON files are written to (defaults to `paths.output`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Don't show the progress bar
    #[arg(short, long)]
    quiet: bool,
}

/// What happened to each document of a batch.
#[derive(Debug, Default)]
pub struct Summary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let input = app.input.unwrap_or_else(|| settings.config.paths.input.clone());
    let output = app.output.unwrap_or_else(|| settings.config.paths.output.clone());

    let files = list_pdfs(&input)?;
    std::fs::create_dir_all(&output)
        .wrap_err_with(|| f!("failed to create output directory {}", output.display()))?;
    log::info!("{} PDF file(s) in {}", files.len(), input.display());

    let bar = progress_bar(files.len() as u64, app.quiet);
    let summary = process_all(&files, &output, &settings, &bar);
    bar.finish_and_clear();

    print_summary(&summary, global.verbose);
    Ok(())
}

/// Process every file in order. A failing document is logged and skipped.
pub fn process_all(
    files: &[PathBuf],
    output: &Path,
    settings: &Settings,
    bar: &ProgressBar,
) -> Summary {
    let mut summary = Summary::default();
    for path in files {
        if let Some(name) = path.file_name() {
            bar.set_message(name.to_string_lossy().into_owned());
        }
        match process_file(path, output, settings) {
            Ok(Some(out)) => summary.written.push(out),
            Ok(None) => {
                log::info!("{}: no heading candidates, skipped", path.display());
                summary.skipped.push(path.clone());
            }
            Err(err) => {
                log::error!("{}: {err:#}", path.display());
                summary.failed.push((path.clone(), f!("{err:#}")));
            }
        }
        bar.inc(1);
    }
    summary
}

/// Outline one PDF into `<output>/<stem>.json`. `None` when no file was written.
pub fn process_file(path: &Path, output: &Path, settings: &Settings) -> Result<Option<PathBuf>> {
    let Some(outline) = outline_for_file(path, settings)? else {
        return Ok(None);
    };
    let out = output.join(f!("{}.json", title_for(path)?));
    write_outline(&out, &outline)?;
    Ok(Some(out))
}

/// `*.pdf` files (any case) directly inside `dir`, sorted by name.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputNotFound(dir.display().to_string()).into());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).wrap_err_with(|| f!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

fn print_summary(summary: &Summary, verbose: bool) {
    if verbose {
        for out in &summary.written {
            println!("  {} {}", "wrote".green(), out.display());
        }
        for path in &summary.skipped {
            println!("  {} {}", "skipped".yellow(), path.display());
        }
    }
    for (path, err) in &summary.failed {
        println!("  {} {}: {}", "failed".red(), path.display(), err);
    }
    println!(
        "{} written, {} skipped, {} failed",
        summary.written.len().to_string().green().bold(),
        summary.skipped.len().to_string().yellow(),
        summary.failed.len().to_string().red()
    );
}
