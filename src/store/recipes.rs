//! Recipe rows. Owned lists and nutrition are stored as JSON columns.

use super::references::{linked_names, Reference};
use crate::error::{ImportError, Result};
use crate::model::{Course, Difficulty, Rating, Recipe, RecipeCategory, RecipeTag};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RECIPE_COLUMNS: &str = "id, name, created_at, modified_at, source, source_details, url, \
     introduction, difficulty, rating, yield_text, servings, directions_json, ingredients_json, \
     notes_json, preparation_times_json, nutrition_json, image_filename, course_id";

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| ImportError::InvalidData(format!("bad timestamp '{raw}': {e}")))
}

/// Inserts the base row of a recipe. Course and image are written later
/// with [`set_recipe_course`] and [`set_recipe_image`].
pub fn insert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    let nutrition = recipe
        .nutrition
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        &format!(
            "INSERT INTO recipes ({RECIPE_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            recipe.id,
            recipe.name,
            encode_time(&recipe.created_at),
            encode_time(&recipe.modified_at),
            recipe.source,
            recipe.source_details,
            recipe.url,
            recipe.introduction,
            recipe.difficulty.code(),
            recipe.rating.code(),
            recipe.yield_text,
            recipe.servings,
            serde_json::to_string(&recipe.directions)?,
            serde_json::to_string(&recipe.ingredients)?,
            serde_json::to_string(&recipe.notes)?,
            serde_json::to_string(&recipe.preparation_times)?,
            nutrition,
            recipe.image_filename,
            recipe.course_id,
        ],
    )?;
    Ok(())
}

fn update_one(conn: &Connection, sql: &str, value: &str, recipe_id: &str) -> Result<()> {
    let changed = conn.execute(sql, params![value, recipe_id])?;
    if changed == 0 {
        return Err(ImportError::InvalidData(format!(
            "recipe '{recipe_id}' does not exist"
        )));
    }
    Ok(())
}

pub fn set_recipe_image(conn: &Connection, recipe_id: &str, filename: &str) -> Result<()> {
    update_one(
        conn,
        "UPDATE recipes SET image_filename = ?1 WHERE id = ?2",
        filename,
        recipe_id,
    )
}

pub fn set_recipe_course(conn: &Connection, recipe_id: &str, course_id: &str) -> Result<()> {
    update_one(
        conn,
        "UPDATE recipes SET course_id = ?1 WHERE id = ?2",
        course_id,
        recipe_id,
    )
}

struct RecipeRow {
    id: String,
    name: String,
    created_at: String,
    modified_at: String,
    source: Option<String>,
    source_details: Option<String>,
    url: Option<String>,
    introduction: Option<String>,
    difficulty: i64,
    rating: i64,
    yield_text: Option<String>,
    servings: Option<u32>,
    directions: String,
    ingredients: String,
    notes: String,
    preparation_times: String,
    nutrition: Option<String>,
    image_filename: Option<String>,
    course_id: Option<String>,
}

impl RecipeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            modified_at: row.get(3)?,
            source: row.get(4)?,
            source_details: row.get(5)?,
            url: row.get(6)?,
            introduction: row.get(7)?,
            difficulty: row.get(8)?,
            rating: row.get(9)?,
            yield_text: row.get(10)?,
            servings: row.get(11)?,
            directions: row.get(12)?,
            ingredients: row.get(13)?,
            notes: row.get(14)?,
            preparation_times: row.get(15)?,
            nutrition: row.get(16)?,
            image_filename: row.get(17)?,
            course_id: row.get(18)?,
        })
    }

    fn into_recipe(self) -> Result<Recipe> {
        Ok(Recipe {
            id: self.id,
            name: self.name,
            created_at: decode_time(&self.created_at)?,
            modified_at: decode_time(&self.modified_at)?,
            source: self.source,
            source_details: self.source_details,
            url: self.url,
            introduction: self.introduction,
            difficulty: Difficulty::from_code(self.difficulty),
            rating: Rating::from_code(self.rating),
            yield_text: self.yield_text,
            servings: self.servings,
            directions: serde_json::from_str(&self.directions)?,
            ingredients: serde_json::from_str(&self.ingredients)?,
            notes: serde_json::from_str(&self.notes)?,
            preparation_times: serde_json::from_str(&self.preparation_times)?,
            nutrition: self
                .nutrition
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            image_filename: self.image_filename,
            course_id: self.course_id,
            course: None,
            categories: Vec::new(),
            tags: Vec::new(),
        })
    }
}

/// Loads a recipe together with its course, category and tag names.
pub fn load_recipe(conn: &Connection, id: &str) -> Result<Option<Recipe>> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
            [id],
            RecipeRow::read,
        )
        .optional()?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut recipe = row.into_recipe()?;
    if let Some(course_id) = &recipe.course_id {
        recipe.course = conn
            .query_row(
                &format!("SELECT name FROM {} WHERE id = ?1", Course::TABLE),
                [course_id],
                |row| row.get(0),
            )
            .optional()?;
    }
    recipe.categories = linked_names::<RecipeCategory>(conn, id)?;
    recipe.tags = linked_names::<RecipeTag>(conn, id)?;
    Ok(Some(recipe))
}

/// Recipe ids in insertion order.
pub fn list_recipe_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM recipes ORDER BY rowid")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn count_recipes(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
    Ok(count as usize)
}
