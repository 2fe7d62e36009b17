use std::path::{Path, PathBuf};

use pdf::{Document, DocumentMetadata};
use pdfoutline_core::outline::Outline;
use pdfoutline_core::pipeline::process_document;

use crate::prelude::{eprintln, println, *};
use crate::settings::Settings;

#[derive(Debug, clap::Args)]
#[command(about = "Extract the heading outline of one PDF")]
pub struct App {
    /// Path to the PDF file
    path: PathBuf,

    /// Output file path (if omitted, prints the JSON to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let doc = load_pdf(&app.path)?;
    if global.verbose {
        eprintln!("{}: {}", app.path.display(), describe(&doc.metadata));
    }

    match outline_for_document(&doc, &app.path, &settings)? {
        Some(outline) => match app.output {
            Some(out) => {
                write_outline(&out, &outline)?;
                if global.verbose {
                    eprintln!("{} heading(s) written to {}", outline.outline.len(), out.display());
                }
            }
            None => println!("{}", outline.to_json_pretty()?),
        },
        None => eprintln!("{}: no heading candidates, nothing written", app.path.display()),
    }
    Ok(())
}

/// The document title: the file name without its extension.
pub fn title_for(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_eyre(Error::NoFileStem(path.display().to_string()))
}

/// Page count plus whichever Info-dictionary fields the document has.
pub fn describe(metadata: &DocumentMetadata) -> String {
    let mut parts = vec![f!("{} page(s)", metadata.page_count)];
    let fields = [
        ("title", &metadata.title),
        ("author", &metadata.author),
        ("creator", &metadata.creator),
    ];
    for (name, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            parts.push(f!("{name} {value:?}"));
        }
    }
    parts.join(", ")
}

fn load_pdf(path: &Path) -> Result<Document> {
    let doc = pdf::load_file(path).wrap_err_with(|| f!("failed to parse {}", path.display()))?;
    log::debug!("{}: {}", path.display(), describe(&doc.metadata));
    Ok(doc)
}

/// Parse `path` and run the pipeline on it. `None` when nothing should be
/// written for this document.
pub fn outline_for_file(path: &Path, settings: &Settings) -> Result<Option<Outline>> {
    let doc = load_pdf(path)?;
    outline_for_document(&doc, path, settings)
}

/// Run the pipeline on an already parsed `doc`, titled after `path`.
pub fn outline_for_document(
    doc: &Document,
    path: &Path,
    settings: &Settings,
) -> Result<Option<Outline>> {
    let title = title_for(path)?;
    let outline = process_document(doc, &title, &settings.model, &settings.config.heuristics)?;
    Ok(outline)
}

/// Write `outline` as 4-space indented JSON.
pub fn write_outline(path: &Path, outline: &Outline) -> Result<()> {
    let json = outline.to_json_pretty()?;
    std::fs::write(path, json).wrap_err_with(|| f!("failed to write {}", path.display()))
}
