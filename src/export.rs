//! Writes persisted recipes back out in the canonical JSON format.

use crate::error::{ImportError, Result};
use crate::images::ImageStore;
use crate::parsers::CanonicalRecipe;
use crate::store;
use log::{debug, warn};
use rusqlite::Connection;

/// Loads each recipe in `ids` with its references and image bytes.
pub fn export_recipes(
    conn: &Connection,
    images: &dyn ImageStore,
    ids: &[String],
) -> Result<Vec<CanonicalRecipe>> {
    let mut exported = Vec::with_capacity(ids.len());
    for id in ids {
        let recipe = store::load_recipe(conn, id)?
            .ok_or_else(|| ImportError::InvalidData(format!("recipe '{id}' does not exist")))?;

        let image = match &recipe.image_filename {
            Some(filename) => {
                let bytes = images.load(filename)?;
                if bytes.is_none() {
                    warn!("Export: Image {filename} for '{}' is missing", recipe.name);
                }
                bytes
            }
            None => None,
        };

        exported.push(CanonicalRecipe::from_recipe(&recipe, image.as_deref()));
    }
    debug!("Export: Prepared {} recipes", exported.len());
    Ok(exported)
}

/// Exports `ids` (or every stored recipe when `None`) as a pretty JSON array.
pub fn export_to_string(
    conn: &Connection,
    images: &dyn ImageStore,
    ids: Option<&[String]>,
) -> Result<String> {
    let recipes = match ids {
        Some(ids) => export_recipes(conn, images, ids)?,
        None => export_recipes(conn, images, &store::list_recipe_ids(conn)?)?,
    };
    Ok(serde_json::to_string_pretty(&recipes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::MemoryImageStore;
    use crate::model::{DraftOrigin, ParsedRecipe, RecipeDraft, SideData};
    use crate::persist::commit;

    #[test]
    fn test_export_includes_references_and_image() {
        let conn = store::open_in_memory().unwrap();
        let images = MemoryImageStore::new();
        let mut side = SideData::new(DraftOrigin::Canonical);
        side.image = Some(vec![0xff, 0xd8, 0xff]);
        side.course = Some("Dessert".to_string());
        side.tags = Some(vec!["sweet".to_string()]);
        let recipe = commit(
            &conn,
            &images,
            ParsedRecipe {
                draft: RecipeDraft::new("Flan"),
                side,
            },
        )
        .unwrap();

        let exported = export_recipes(&conn, &images, &[recipe.id.clone()]).unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "Flan");
        assert_eq!(exported[0].course.as_deref(), Some("Dessert"));
        assert_eq!(exported[0].tags, Some(vec!["sweet".to_string()]));
        assert_eq!(exported[0].image.as_deref(), Some("/9j/"));
    }

    #[test]
    fn test_export_unknown_id_fails() {
        let conn = store::open_in_memory().unwrap();
        let result = export_recipes(&conn, &MemoryImageStore::new(), &["nope".to_string()]);
        assert!(matches!(result, Err(ImportError::InvalidData(_))));
    }

    #[test]
    fn test_export_empty_store() {
        let conn = store::open_in_memory().unwrap();
        let json = export_to_string(&conn, &MemoryImageStore::new(), None).unwrap();
        assert_eq!(json, "[]");
    }
}
