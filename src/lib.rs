//! Recipe ingestion: MacGourmet, schema.org JSON-LD and canonical JSON
//! parsers feeding a SQLite store that deduplicates categories, tags and
//! courses by name.

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod images;
pub mod import;
pub mod model;
pub mod parsers;
pub mod persist;
pub mod store;
pub mod text;

pub use builder::RecipeImporterBuilder;
pub use config::ImportConfig;
pub use error::{ImportError, Result};
pub use fetch::{HttpFetcher, PageFetcher};
pub use images::{FsImageStore, ImageStore, MemoryImageStore};
pub use import::{import_batch, parse_input, ImportFailure, ImportSummary, RecipeImporter};
pub use model::{
    Category, Course, Difficulty, Direction, DraftOrigin, Ingredient, Note, NutritionInformation,
    ParsedRecipe, PreparationTime, Rating, Recipe, RecipeCategory, RecipeDraft, RecipeTag,
    SideData, Tag,
};
pub use parsers::{
    CanonicalParser, CanonicalRecipe, JsonLdParser, MacGourmetParser, RecipeParser, SourceFormat,
};
