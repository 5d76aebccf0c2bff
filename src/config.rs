use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Importer configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ImportConfig {
    /// SQLite database file holding the recipe store
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Directory where recipe images are written
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Whether `import_url` downloads the recipe's image
    #[serde(default = "default_download_images")]
    pub download_images: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            image_dir: default_image_dir(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            download_images: default_download_images(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("recipes.sqlite3")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; RecipeImport/0.1)".to_string()
}

fn default_download_images() -> bool {
    true
}

impl ImportConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_IMPORT__ prefix
    /// 2. recipe-import.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_IMPORT__DATABASE_PATH
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("recipe-import").required(false))
            .add_source(
                Environment::with_prefix("RECIPE_IMPORT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from an explicit TOML file, without the environment.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
