//! Case-insensitive reference entities (categories, tags, courses) and the
//! join rows that attach them to recipes.

use crate::error::Result;
use crate::model::{Category, Course, RecipeCategory, RecipeTag, Tag};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// A named entity shared between recipes and matched by name without case.
pub trait Reference: Sized {
    const TABLE: &'static str;

    fn from_row(id: String, name: String) -> Self;
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// A join row between a recipe and one [`Reference`].
pub trait Link: Sized {
    type Target: Reference;
    const TABLE: &'static str;
    const TARGET_COLUMN: &'static str;

    fn from_row(id: String, recipe_id: String, target_id: String) -> Self;
}

macro_rules! reference {
    ($ty:ty, $table:literal) => {
        impl Reference for $ty {
            const TABLE: &'static str = $table;

            fn from_row(id: String, name: String) -> Self {
                Self { id, name }
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

reference!(Category, "categories");
reference!(Tag, "tags");
reference!(Course, "courses");

impl Link for RecipeCategory {
    type Target = Category;
    const TABLE: &'static str = "recipe_categories";
    const TARGET_COLUMN: &'static str = "category_id";

    fn from_row(id: String, recipe_id: String, category_id: String) -> Self {
        Self {
            id,
            recipe_id,
            category_id,
        }
    }
}

impl Link for RecipeTag {
    type Target = Tag;
    const TABLE: &'static str = "recipe_tags";
    const TARGET_COLUMN: &'static str = "tag_id";

    fn from_row(id: String, recipe_id: String, tag_id: String) -> Self {
        Self { id, recipe_id, tag_id }
    }
}

/// Lookup key for a reference name.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// Finds the oldest reference whose name matches `name` ignoring case.
pub fn find_by_name<R: Reference>(conn: &Connection, name: &str) -> Result<Option<R>> {
    let sql = format!(
        "SELECT id, name FROM {} WHERE name_key = ?1 ORDER BY rowid LIMIT 1",
        R::TABLE
    );
    let found = conn
        .query_row(&sql, [name_key(name)], |row| {
            Ok(R::from_row(row.get(0)?, row.get(1)?))
        })
        .optional()?;
    Ok(found)
}

/// Inserts a new reference row. Callers check [`find_by_name`] first.
pub fn insert_reference<R: Reference>(conn: &Connection, name: &str) -> Result<R> {
    let id = Uuid::new_v4().to_string();
    let sql = format!(
        "INSERT INTO {} (id, name, name_key) VALUES (?1, ?2, ?3)",
        R::TABLE
    );
    conn.execute(&sql, params![id, name, name_key(name)])?;
    Ok(R::from_row(id, name.to_string()))
}

pub fn list_references<R: Reference>(conn: &Connection) -> Result<Vec<R>> {
    let sql = format!("SELECT id, name FROM {} ORDER BY name_key, rowid", R::TABLE);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(R::from_row(row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn count_references<R: Reference>(conn: &Connection) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}

pub fn link_exists<L: Link>(conn: &Connection, recipe_id: &str, target_id: &str) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE recipe_id = ?1 AND {} = ?2)",
        L::TABLE,
        L::TARGET_COLUMN
    );
    let exists: bool = conn.query_row(&sql, params![recipe_id, target_id], |row| row.get(0))?;
    Ok(exists)
}

/// Inserts a join row. Callers check [`link_exists`] first.
pub fn insert_link<L: Link>(conn: &Connection, recipe_id: &str, target_id: &str) -> Result<L> {
    let id = Uuid::new_v4().to_string();
    let sql = format!(
        "INSERT INTO {} (id, recipe_id, {}) VALUES (?1, ?2, ?3)",
        L::TABLE,
        L::TARGET_COLUMN
    );
    conn.execute(&sql, params![id, recipe_id, target_id])?;
    Ok(L::from_row(id, recipe_id.to_string(), target_id.to_string()))
}

pub fn list_links<L: Link>(conn: &Connection, recipe_id: &str) -> Result<Vec<L>> {
    let sql = format!(
        "SELECT id, recipe_id, {} FROM {} WHERE recipe_id = ?1 ORDER BY rowid",
        L::TARGET_COLUMN,
        L::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([recipe_id], |row| {
        Ok(L::from_row(row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn count_links<L: Link>(conn: &Connection, recipe_id: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE recipe_id = ?1", L::TABLE);
    let count: i64 = conn.query_row(&sql, [recipe_id], |row| row.get(0))?;
    Ok(count as usize)
}

/// Names of the references linked to a recipe, sorted without case.
pub fn linked_names<L: Link>(conn: &Connection, recipe_id: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT r.name, r.name_key FROM {link} l
         JOIN {target} r ON r.id = l.{column}
         WHERE l.recipe_id = ?1
         ORDER BY r.name_key",
        link = L::TABLE,
        target = <L::Target as Reference>::TABLE,
        column = L::TARGET_COLUMN,
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([recipe_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
