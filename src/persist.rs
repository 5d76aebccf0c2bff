//! Commits one parsed recipe: the base row first, then image, categories,
//! tags and course against the freshly inserted row.
//!
//! Every row is written on the caller's transaction. An image already handed
//! to the image store is removed again when a later step fails.

use crate::error::Result;
use crate::images::ImageStore;
use crate::model::{
    Course, DraftOrigin, ParsedRecipe, Recipe, RecipeCategory, RecipeTag, SideData,
};
use crate::parsers::NO_COURSE_PLACEHOLDER;
use crate::store::{self, Link, Reference};
use log::{debug, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Persists `parsed` and returns the stored recipe with its references.
pub fn commit(conn: &Connection, images: &dyn ImageStore, parsed: ParsedRecipe) -> Result<Recipe> {
    let ParsedRecipe { draft, side } = parsed;

    let mut recipe = Recipe::from_draft(Uuid::new_v4().to_string(), draft);
    store::insert_recipe(conn, &recipe)?;
    debug!("Persist: Inserted recipe {} ({})", recipe.id, recipe.name);

    store_image(images, &mut recipe, &side)?;

    // the blob lives outside the transaction, so a rollback cannot undo it
    if let Err(e) = update_references(conn, &mut recipe, &side) {
        discard_image(images, &recipe);
        return Err(e);
    }
    Ok(recipe)
}

/// Removes the image stored for a recipe whose transaction will not commit.
pub fn discard_image(images: &dyn ImageStore, recipe: &Recipe) {
    let Some(filename) = &recipe.image_filename else {
        return;
    };
    match images.remove(filename) {
        Ok(()) => debug!("Persist: Discarded image {filename} of {}", recipe.id),
        Err(e) => warn!("Persist: Could not discard image {filename}: {e}"),
    }
}

fn update_references(conn: &Connection, recipe: &mut Recipe, side: &SideData) -> Result<()> {
    if let Some(filename) = &recipe.image_filename {
        store::set_recipe_image(conn, &recipe.id, filename)?;
    }
    if let Some(names) = &side.categories {
        recipe.categories = attach_references::<RecipeCategory>(conn, &recipe.id, names)?;
    }
    if let Some(names) = &side.tags {
        recipe.tags = attach_references::<RecipeTag>(conn, &recipe.id, names)?;
    }
    attach_course(conn, recipe, side)
}

fn store_image(images: &dyn ImageStore, recipe: &mut Recipe, side: &SideData) -> Result<()> {
    let Some(bytes) = side.image.as_deref().filter(|bytes| !bytes.is_empty()) else {
        return Ok(());
    };
    recipe.image_filename = Some(images.store(&recipe.id, bytes)?);
    Ok(())
}

/// Reuses or creates one reference per distinct name and links each once.
fn attach_references<L: Link>(
    conn: &Connection,
    recipe_id: &str,
    names: &[String],
) -> Result<Vec<String>> {
    // first spelling wins for names that differ only in case
    let mut distinct: BTreeMap<String, &str> = BTreeMap::new();
    for name in names.iter().map(|name| name.trim()).filter(|name| !name.is_empty()) {
        distinct.entry(store::name_key(name)).or_insert(name);
    }

    let mut linked = Vec::with_capacity(distinct.len());
    for name in distinct.into_values() {
        let reference = find_or_create::<L::Target>(conn, name)?;
        if !store::link_exists::<L>(conn, recipe_id, reference.id())? {
            store::insert_link::<L>(conn, recipe_id, reference.id())?;
        }
        linked.push(reference.name().to_string());
    }
    Ok(linked)
}

fn find_or_create<R: Reference>(conn: &Connection, name: &str) -> Result<R> {
    match store::find_by_name::<R>(conn, name)? {
        Some(existing) => Ok(existing),
        None => {
            debug!("Persist: Creating {} entry '{}'", R::TABLE, name);
            store::insert_reference::<R>(conn, name)
        }
    }
}

fn attach_course(conn: &Connection, recipe: &mut Recipe, side: &SideData) -> Result<()> {
    let Some(name) = side.course.as_deref().map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(());
    };
    if side.origin == DraftOrigin::MacGourmet && name == NO_COURSE_PLACEHOLDER {
        return Ok(());
    }

    let course = find_or_create::<Course>(conn, name)?;
    store::set_recipe_course(conn, &recipe.id, &course.id)?;
    recipe.course = Some(course.name);
    recipe.course_id = Some(course.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;
    use crate::images::MemoryImageStore;
    use crate::model::{Category, RecipeDraft, Tag};
    use crate::store::{count_links, count_references, open_in_memory};

    fn parsed(name: &str, origin: DraftOrigin) -> ParsedRecipe {
        ParsedRecipe {
            draft: RecipeDraft::new(name),
            side: SideData::new(origin),
        }
    }

    fn strings(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|name| name.to_string()).collect())
    }

    #[test]
    fn test_duplicate_category_in_one_draft() {
        let conn = open_in_memory().unwrap();
        let mut item = parsed("Pie", DraftOrigin::Canonical);
        item.side.categories = strings(&["Dessert", "dessert", " DESSERT ", ""]);

        let recipe = commit(&conn, &MemoryImageStore::new(), item).unwrap();
        assert_eq!(recipe.categories, vec!["Dessert".to_string()]);
        assert_eq!(count_references::<Category>(&conn).unwrap(), 1);
        assert_eq!(count_links::<RecipeCategory>(&conn, &recipe.id).unwrap(), 1);
    }

    #[test]
    fn test_references_reused_across_recipes() {
        let conn = open_in_memory().unwrap();
        let images = MemoryImageStore::new();

        let mut first = parsed("One", DraftOrigin::Canonical);
        first.side.tags = strings(&["Quick"]);
        first.side.course = Some("Main".to_string());
        let first = commit(&conn, &images, first).unwrap();

        let mut second = parsed("Two", DraftOrigin::SchemaOrg);
        second.side.tags = strings(&["quick", "Vegan"]);
        second.side.course = Some("MAIN".to_string());
        let second = commit(&conn, &images, second).unwrap();

        assert_eq!(count_references::<Tag>(&conn).unwrap(), 2);
        assert_eq!(count_references::<Course>(&conn).unwrap(), 1);
        assert_eq!(first.course_id, second.course_id);
        assert_eq!(second.course.as_deref(), Some("Main"));
        assert_eq!(second.tags, vec!["Quick".to_string(), "Vegan".to_string()]);
    }

    #[test]
    fn test_placeholder_course_skipped_for_mac_gourmet() {
        let conn = open_in_memory().unwrap();
        let images = MemoryImageStore::new();

        let mut item = parsed("Plain", DraftOrigin::MacGourmet);
        item.side.course = Some("--".to_string());
        let recipe = commit(&conn, &images, item).unwrap();
        assert_eq!(recipe.course_id, None);
        assert_eq!(count_references::<Course>(&conn).unwrap(), 0);

        let mut blank = parsed("Blank", DraftOrigin::Canonical);
        blank.side.course = Some("   ".to_string());
        assert_eq!(commit(&conn, &images, blank).unwrap().course_id, None);
        assert_eq!(count_references::<Course>(&conn).unwrap(), 0);
    }

    #[test]
    fn test_image_stored_under_recipe_id() {
        let conn = open_in_memory().unwrap();
        let images = MemoryImageStore::new();
        let mut item = parsed("Photo", DraftOrigin::Canonical);
        item.side.image = Some(b"\x89PNG\r\n\x1a\n....".to_vec());

        let recipe = commit(&conn, &images, item).unwrap();
        let filename = recipe.image_filename.clone().unwrap();
        assert_eq!(filename, format!("{}.png", recipe.id));
        assert!(images.load(&filename).unwrap().is_some());

        let stored = store::load_recipe(&conn, &recipe.id).unwrap().unwrap();
        assert_eq!(stored.image_filename, Some(filename));
    }

    struct BrokenImages;

    impl ImageStore for BrokenImages {
        fn store(&self, _owner_id: &str, _bytes: &[u8]) -> Result<String> {
            Err(ImportError::ImageStoreError("disk full".to_string()))
        }

        fn load(&self, _filename: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn remove(&self, _filename: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failure_rolls_back_with_transaction() {
        let mut conn = open_in_memory().unwrap();
        let mut item = parsed("Broken", DraftOrigin::Canonical);
        item.side.image = Some(vec![1, 2, 3]);
        item.side.categories = strings(&["Never"]);

        let tx = store::begin_write(&mut conn).unwrap();
        assert!(commit(&tx, &BrokenImages, item).is_err());
        drop(tx);

        assert_eq!(store::count_recipes(&conn).unwrap(), 0);
        assert_eq!(count_references::<Category>(&conn).unwrap(), 0);
    }

    #[test]
    fn test_failed_reference_step_removes_stored_image() {
        let dir = tempfile::tempdir().unwrap();
        let images = crate::images::FsImageStore::new(dir.path()).unwrap();
        let mut conn = open_in_memory().unwrap();
        conn.execute_batch("DROP TABLE recipe_categories").unwrap();

        let mut item = parsed("Orphan", DraftOrigin::Canonical);
        item.side.image = Some(vec![0xff, 0xd8, 0xff]);
        item.side.categories = strings(&["Lost"]);

        let tx = store::begin_write(&mut conn).unwrap();
        assert!(commit(&tx, &images, item).is_err());
        drop(tx);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(store::count_recipes(&conn).unwrap(), 0);
    }
}
