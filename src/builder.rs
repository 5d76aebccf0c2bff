use std::path::PathBuf;
use std::time::Duration;

use crate::{
    config::ImportConfig,
    fetch::{HttpFetcher, PageFetcher},
    images::{FsImageStore, ImageStore},
    store, RecipeImporter, Result,
};

/// Where the recipe store lives
#[derive(Debug, Clone)]
enum Database {
    File(PathBuf),
    InMemory,
}

/// Builder for configuring a [`RecipeImporter`]
///
/// Anything left unset falls back to [`ImportConfig`], which itself defaults
/// to `recipes.sqlite3` and an `images` directory next to it.
#[derive(Default)]
pub struct RecipeImporterBuilder {
    config: Option<ImportConfig>,
    database: Option<Database>,
    image_dir: Option<PathBuf>,
    images: Option<Box<dyn ImageStore>>,
    fetcher: Option<Box<dyn PageFetcher>>,
    timeout: Option<Duration>,
    download_images: Option<bool>,
}

impl RecipeImporterBuilder {
    /// Use `config` for every setting not overridden on the builder
    pub fn config(mut self, config: ImportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Store recipes in the SQLite file at `path`
    ///
    /// # Example
    /// ```no_run
    /// use recipe_import::RecipeImporter;
    ///
    /// let importer = RecipeImporter::builder()
    ///     .database("kitchen.sqlite3")
    ///     .image_dir("kitchen-images")
    ///     .build();
    /// ```
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(Database::File(path.into()));
        self
    }

    /// Keep the store in memory; nothing survives the importer
    pub fn in_memory(mut self) -> Self {
        self.database = Some(Database::InMemory);
        self
    }

    /// Write images as files into `dir`
    pub fn image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    /// Use a custom image store instead of a directory
    ///
    /// # Example
    /// ```
    /// use recipe_import::{MemoryImageStore, RecipeImporter};
    ///
    /// let importer = RecipeImporter::builder()
    ///     .in_memory()
    ///     .images(MemoryImageStore::new())
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(importer.export_json(None).unwrap(), "[]");
    /// ```
    pub fn images(mut self, images: impl ImageStore + 'static) -> Self {
        self.images = Some(Box::new(images));
        self
    }

    /// Use a custom page fetcher for URL imports
    pub fn fetcher(mut self, fetcher: impl PageFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Set the HTTP timeout used by the default fetcher
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Whether URL imports download the recipe image
    pub fn download_images(mut self, enabled: bool) -> Self {
        self.download_images = Some(enabled);
        self
    }

    /// Open the store and assemble the importer
    pub fn build(self) -> Result<RecipeImporter> {
        let config = self.config.unwrap_or_default();

        let conn = match self.database {
            Some(Database::File(path)) => store::open(path)?,
            Some(Database::InMemory) => store::open_in_memory()?,
            None => store::open(&config.database_path)?,
        };

        let images: Box<dyn ImageStore> = match self.images {
            Some(images) => images,
            None => Box::new(FsImageStore::new(
                self.image_dir.unwrap_or_else(|| config.image_dir.clone()),
            )?),
        };

        let fetcher: Box<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let timeout = self
                    .timeout
                    .unwrap_or_else(|| Duration::from_secs(config.timeout));
                Box::new(HttpFetcher::new(timeout, &config.user_agent)?)
            }
        };

        Ok(RecipeImporter::from_parts(
            conn,
            images,
            fetcher,
            self.download_images.unwrap_or(config.download_images),
        ))
    }
}
