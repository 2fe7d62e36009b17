use std::path::PathBuf;

use pdfoutline_core::features::{extract_features, FeatureRecord};

use crate::prelude::{println, *};
use crate::settings::load_config;

#[derive(Debug, clap::Args)]
#[command(about = "Dump the heading candidates of a PDF (training data, debugging)")]
pub struct App {
    /// Path to the PDF file
    path: PathBuf,

    /// Print a table instead of JSON
    #[arg(short, long)]
    table: bool,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let config = load_config(&global)?;
    let doc = pdf::load_file(&app.path)
        .wrap_err_with(|| f!("failed to parse {}", app.path.display()))?;
    let records = extract_features(&doc, &config.heuristics);

    if app.table {
        records_table(&records).printstd();
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }
    if global.verbose {
        println!("{} candidate line(s)", records.len());
    }
    Ok(())
}

fn records_table(records: &[FeatureRecord]) -> prettytable::Table {
    let mut table = new_table(&[
        "Page", "Size", "Font", "Bold", "Caps", "Len", "Color", "Script", "Text",
    ]);
    for r in records {
        table.add_row(prettytable::row![
            r.page_number,
            r.font_size,
            r.font_name,
            r.is_bold,
            r.is_caps,
            r.line_length,
            r.color_rgb,
            r.script_type,
            r.text
        ]);
    }
    table
}
