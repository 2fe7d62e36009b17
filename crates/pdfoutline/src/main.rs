use crate::prelude::*;
use clap::Parser;

mod error;
mod features;
mod outline;
mod prelude;
mod run;
mod schema;
mod settings;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract H1/H2/H3 heading outlines from PDF documents as JSON"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct Global {
    /// Configuration file (defaults to ./pdfoutline.toml when present)
    #[clap(long, env = "PDFOUTLINE_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// LightGBM text model, overriding the configured one
    #[clap(long, env = "PDFOUTLINE_MODEL", global = true)]
    model: Option<std::path::PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "PDFOUTLINE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Write an outline for every PDF of the input directory
    Run(crate::run::App),

    /// Print or write the outline of a single PDF
    Outline(crate::outline::App),

    /// Dump the heading candidates of a PDF
    Features(crate::features::App),

    /// Print the feature schema of the loaded model
    Schema(crate::schema::App),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Run(sub_app) => crate::run::run(sub_app, app.global),
        SubCommands::Outline(sub_app) => crate::outline::run(sub_app, app.global),
        SubCommands::Features(sub_app) => crate::features::run(sub_app, app.global),
        SubCommands::Schema(sub_app) => crate::schema::run(sub_app, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
