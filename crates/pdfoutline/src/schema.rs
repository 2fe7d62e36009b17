use std::path::PathBuf;

use pdfoutline_core::classifier::HeadingClassifier;

use crate::prelude::{println, *};
use crate::settings::Settings;

#[derive(Debug, clap::Args)]
#[command(about = "Print the feature schema of the loaded model")]
pub struct App {
    /// Write the schema to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(app: App, global: crate::Global) -> Result<()> {
    let settings = Settings::load(&global)?;
    let schema = settings.model.schema();
    let json = serde_json::to_string_pretty(&schema)?;

    match app.output {
        Some(out) => std::fs::write(&out, json)
            .wrap_err_with(|| f!("failed to write {}", out.display()))?,
        None => println!("{json}"),
    }
    if global.verbose {
        println!(
            "{} columns, {} trees, classes: {}",
            schema.columns.len(),
            settings.model.num_trees(),
            settings
                .model
                .classes()
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}
