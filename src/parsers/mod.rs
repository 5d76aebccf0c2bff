use crate::error::{ImportError, Result};
use crate::model::ParsedRecipe;
use std::path::Path;

mod canonical;
mod json_ld;
mod mac_gourmet;

pub use canonical::{CanonicalParser, CanonicalRecipe, CANONICAL_VERSION};
pub use json_ld::JsonLdParser;
pub use mac_gourmet::{MacGourmetParser, NO_COURSE_PLACEHOLDER};

/// Turns one external byte format into recipe drafts.
///
/// Missing or malformed fields are left out of the draft. An `Err` means the
/// container itself could not be read.
pub trait RecipeParser {
    fn parse(&self, input: &[u8]) -> Result<Vec<ParsedRecipe>>;
}

/// Import formats the crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    MacGourmet,
    SchemaOrg,
    Canonical,
}

impl SourceFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "mgourmet" | "mgourmet4" | "plist" => Ok(SourceFormat::MacGourmet),
            "json" => Ok(SourceFormat::Canonical),
            "html" | "htm" => Ok(SourceFormat::SchemaOrg),
            _ => Err(ImportError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn parser(self) -> Box<dyn RecipeParser> {
        match self {
            SourceFormat::MacGourmet => Box::new(MacGourmetParser),
            SourceFormat::SchemaOrg => Box::new(JsonLdParser::default()),
            SourceFormat::Canonical => Box::new(CanonicalParser),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("backup.mgourmet")).unwrap(),
            SourceFormat::MacGourmet
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("Export.JSON")).unwrap(),
            SourceFormat::Canonical
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("page.htm")).unwrap(),
            SourceFormat::SchemaOrg
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("notes.txt")),
            Err(ImportError::UnsupportedFormat(_))
        ));
        assert!(SourceFormat::from_path(Path::new("no_extension")).is_err());
    }
}
