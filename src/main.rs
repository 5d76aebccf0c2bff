use clap::{Parser, Subcommand};
use log::error;
use recipe_import::{ImportConfig, ImportSummary, RecipeImporter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recipe-import", about = "Import recipes into a local recipe store")]
struct Args {
    /// TOML config file; defaults to recipe-import.toml plus RECIPE_IMPORT__* variables
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configuration
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Image directory, overriding the configuration
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import MacGourmet, canonical JSON or HTML files
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Fetch a web page and import its schema.org recipes
    Url { url: String },
    /// Write every stored recipe as canonical JSON
    Export { out: PathBuf },
}

fn report(source: &str, summary: &ImportSummary) {
    println!(
        "{source}: {} imported, {} failed",
        summary.success_count, summary.failure_count
    );
    for failure in &summary.failures {
        println!("  failed '{}': {}", failure.name, failure.error);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ImportConfig::load_file(path)?,
        None => ImportConfig::load()?,
    };
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(images) = args.images {
        config.image_dir = images;
    }

    let mut importer = RecipeImporter::open(config)?;

    match args.command {
        Command::Import { files } => {
            for file in files {
                let source = file.display().to_string();
                match importer.import_file(&file) {
                    Ok(summary) => report(&source, &summary),
                    // container-level failure: the file is skipped as a whole
                    Err(e) => error!("{source}: {e}"),
                }
            }
        }
        Command::Url { url } => {
            let summary = importer.import_url(&url).await?;
            report(&url, &summary);
        }
        Command::Export { out } => {
            let json = importer.export_json(None)?;
            std::fs::write(&out, json)?;
            println!("Exported to {}", out.display());
        }
    }

    Ok(())
}
