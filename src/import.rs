//! Batch import: one transaction per recipe, failures counted and skipped.

use crate::builder::RecipeImporterBuilder;
use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::export;
use crate::fetch::PageFetcher;
use crate::images::ImageStore;
use crate::model::{ParsedRecipe, Recipe};
use crate::parsers::{JsonLdParser, RecipeParser, SourceFormat};
use crate::persist;
use crate::store;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// One recipe that could not be stored.
#[derive(Debug)]
pub struct ImportFailure {
    pub name: String,
    pub error: ImportError,
}

/// Outcome of a batch import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub success_count: usize,
    pub failure_count: usize,
    pub failures: Vec<ImportFailure>,
    /// Ids of the committed recipes, in input order
    pub imported_ids: Vec<String>,
}

impl ImportSummary {
    fn record_success(&mut self, recipe: &Recipe) {
        self.success_count += 1;
        self.imported_ids.push(recipe.id.clone());
    }

    fn record_failure(&mut self, name: String, error: ImportError) {
        self.failure_count += 1;
        self.failures.push(ImportFailure { name, error });
    }
}

/// Commits `recipes` in order, each inside its own write transaction.
///
/// A failing recipe is rolled back, recorded in the summary and skipped.
/// Recipes committed before it stay committed.
pub fn import_batch(
    conn: &mut Connection,
    images: &dyn ImageStore,
    recipes: Vec<ParsedRecipe>,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for parsed in recipes {
        let name = parsed.draft.name.clone();
        match import_one(conn, images, parsed) {
            Ok(recipe) => {
                info!("Imported '{}' as {}", recipe.name, recipe.id);
                summary.record_success(&recipe);
            }
            Err(e) => {
                warn!("Failed to import '{name}': {e}");
                summary.record_failure(name, e);
            }
        }
    }

    info!(
        "Batch finished: {} imported, {} failed",
        summary.success_count, summary.failure_count
    );
    summary
}

fn import_one(
    conn: &mut Connection,
    images: &dyn ImageStore,
    parsed: ParsedRecipe,
) -> Result<Recipe> {
    // dropping the transaction on error rolls it back
    let tx = store::begin_write(conn)?;
    let recipe = persist::commit(&tx, images, parsed)?;
    if let Err(e) = tx.commit() {
        persist::discard_image(images, &recipe);
        return Err(e.into());
    }
    Ok(recipe)
}

/// Parses a whole input; an empty result counts as a container-level failure.
pub fn parse_input(parser: &dyn RecipeParser, input: &[u8]) -> Result<Vec<ParsedRecipe>> {
    let recipes = parser.parse(input).inspect_err(|e| error!("Could not read input: {e}"))?;
    if recipes.is_empty() {
        error!("Input contained no recipes");
        return Err(ImportError::NoDataFound);
    }
    debug!("Parsed {} recipes", recipes.len());
    Ok(recipes)
}

/// Owns the store, the image store and the fetcher for a run of imports.
pub struct RecipeImporter {
    conn: Connection,
    images: Box<dyn ImageStore>,
    fetcher: Box<dyn PageFetcher>,
    download_images: bool,
}

impl RecipeImporter {
    /// Create a new builder for configuring an importer
    pub fn builder() -> RecipeImporterBuilder {
        RecipeImporterBuilder::default()
    }

    /// Opens the database and image directory named in `config`.
    pub fn open(config: ImportConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub(crate) fn from_parts(
        conn: Connection,
        images: Box<dyn ImageStore>,
        fetcher: Box<dyn PageFetcher>,
        download_images: bool,
    ) -> Self {
        Self {
            conn,
            images,
            fetcher,
            download_images,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn images(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    /// Commits already parsed recipes.
    pub fn import_parsed(&mut self, recipes: Vec<ParsedRecipe>) -> ImportSummary {
        import_batch(&mut self.conn, self.images.as_ref(), recipes)
    }

    /// Reads a file, choosing the parser from its extension.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let format = SourceFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        info!("Importing {} as {:?}", path.display(), format);
        self.import_bytes(format, &bytes)
    }

    pub fn import_bytes(&mut self, format: SourceFormat, bytes: &[u8]) -> Result<ImportSummary> {
        let recipes = parse_input(format.parser().as_ref(), bytes)?;
        Ok(self.import_parsed(recipes))
    }

    /// Imports the schema.org recipes embedded in `html`, served from `url`.
    pub fn import_html(&mut self, html: &str, url: &str) -> Result<ImportSummary> {
        let recipes = parse_input(&JsonLdParser::for_url(url), html.as_bytes())?;
        Ok(self.import_parsed(recipes))
    }

    /// Fetches a page and imports its schema.org recipes, downloading each
    /// recipe's image when enabled.
    pub async fn import_url(&mut self, url: &str) -> Result<ImportSummary> {
        let html = self.fetcher.fetch_text(url).await?;
        let mut recipes = parse_input(&JsonLdParser::for_url(url), html.as_bytes())?;

        if self.download_images {
            for parsed in &mut recipes {
                let Some(image_url) = parsed.side.image_url.clone() else {
                    continue;
                };
                match self.fetcher.fetch_bytes(&image_url).await {
                    Ok(bytes) if !bytes.is_empty() => parsed.side.image = Some(bytes),
                    Ok(_) => debug!("Empty image at {image_url}"),
                    Err(e) => warn!("Skipping image {image_url} for '{}': {e}", parsed.draft.name),
                }
            }
        }

        Ok(self.import_parsed(recipes))
    }

    /// Exports `ids`, or every stored recipe, as canonical JSON.
    pub fn export_json(&self, ids: Option<&[String]>) -> Result<String> {
        export::export_to_string(&self.conn, self.images.as_ref(), ids)
    }
}
