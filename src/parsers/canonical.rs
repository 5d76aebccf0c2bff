use super::json_ld::parse_date;
use super::RecipeParser;
use crate::error::{ImportError, Result};
use crate::model::{
    Difficulty, Direction, DraftOrigin, Ingredient, Note, NutritionInformation, ParsedRecipe,
    PreparationTime, Rating, Recipe, RecipeDraft, SideData,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version string written into every exported recipe.
pub const CANONICAL_VERSION: &str = "1.0";

fn default_version() -> String {
    CANONICAL_VERSION.to_string()
}

/// One recipe in the application's own JSON interchange format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecipe {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(rename = "yield", default, skip_serializing_if = "Option::is_none")]
    pub yield_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<Direction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preparation_times: Vec<PreparationTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionInformation>,
    /// Base64-encoded image bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CanonicalRecipe {
    /// Builds the export shape of a persisted recipe loaded with its references.
    pub fn from_recipe(recipe: &Recipe, image: Option<&[u8]>) -> Self {
        let non_empty = |names: &[String]| {
            if names.is_empty() {
                None
            } else {
                Some(names.to_vec())
            }
        };

        Self {
            version: default_version(),
            name: recipe.name.clone(),
            created_at: Some(recipe.created_at),
            modified_at: Some(recipe.modified_at),
            source: recipe.source.clone(),
            source_details: recipe.source_details.clone(),
            url: recipe.url.clone(),
            introduction: recipe.introduction.clone(),
            difficulty: Some(recipe.difficulty).filter(|d| *d != Difficulty::NotSet),
            rating: Some(recipe.rating).filter(|r| *r != Rating::NotSet),
            yield_text: recipe.yield_text.clone(),
            servings: recipe.servings,
            course: recipe.course.clone(),
            categories: non_empty(&recipe.categories),
            tags: non_empty(&recipe.tags),
            directions: recipe.directions.clone(),
            ingredients: recipe.ingredients.clone(),
            notes: recipe.notes.clone(),
            preparation_times: recipe.preparation_times.clone(),
            nutrition: recipe.nutrition.clone(),
            image: image.filter(|bytes| !bytes.is_empty()).map(|bytes| STANDARD.encode(bytes)),
        }
    }

    /// Reads one exported record. A field with the wrong shape is left out
    /// instead of failing the record.
    pub fn from_json(record: &Map<String, Value>) -> Self {
        Self {
            version: lenient(record, "version").unwrap_or_else(default_version),
            name: lenient(record, "name").unwrap_or_default(),
            created_at: record.get("createdAt").and_then(parse_date),
            modified_at: record.get("modifiedAt").and_then(parse_date),
            source: lenient(record, "source"),
            source_details: lenient(record, "sourceDetails"),
            url: lenient(record, "url"),
            introduction: lenient(record, "introduction"),
            difficulty: lenient_level(record, "difficulty", Difficulty::from_code),
            rating: lenient_level(record, "rating", Rating::from_code),
            yield_text: lenient(record, "yield"),
            servings: lenient(record, "servings"),
            course: lenient(record, "course"),
            categories: lenient_names(record, "categories"),
            tags: lenient_names(record, "tags"),
            directions: lenient_list(record, "directions"),
            ingredients: lenient_list(record, "ingredients"),
            notes: lenient_list(record, "notes"),
            preparation_times: lenient_list(record, "preparationTimes"),
            nutrition: lenient(record, "nutrition"),
            image: lenient(record, "image"),
        }
    }

    pub fn into_parsed(self) -> ParsedRecipe {
        let mut draft = RecipeDraft::new(self.name);
        if let Some(created) = self.created_at {
            draft.created_at = created;
        }
        draft.modified_at = self.modified_at.unwrap_or(draft.created_at);
        draft.source = self.source;
        draft.source_details = self.source_details;
        draft.url = self.url;
        draft.introduction = self.introduction;
        draft.difficulty = self.difficulty.unwrap_or_default();
        draft.rating = self.rating.unwrap_or_default();
        draft.yield_text = self.yield_text;
        draft.servings = self.servings.filter(|servings| *servings > 0);
        draft.directions = self.directions;
        draft.ingredients = self.ingredients;
        draft.notes = self.notes;
        draft.preparation_times = self.preparation_times;
        draft.nutrition = self.nutrition;

        let mut side = SideData::new(DraftOrigin::Canonical);
        side.image = self.image.and_then(|encoded| match STANDARD.decode(encoded.trim()) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                debug!("CanonicalParser: Ignoring undecodable image for '{}': {e}", draft.name);
                None
            }
        });
        side.course = self.course;
        side.categories = self.categories;
        side.tags = self.tags;

        ParsedRecipe { draft, side }
    }
}

fn lenient<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Option<T> {
    let value = record.get(key).filter(|value| !value.is_null())?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("CanonicalParser: Dropping field '{key}': {e}");
            None
        }
    }
}

/// Enum fields written by name (`"four"`) or by numeric code (`4`).
fn lenient_level<T: DeserializeOwned>(
    record: &Map<String, Value>,
    key: &str,
    from_code: fn(i64) -> T,
) -> Option<T> {
    match record.get(key) {
        Some(Value::Number(code)) => code.as_i64().map(from_code),
        _ => lenient(record, key),
    }
}

/// Owned list entries; malformed entries are skipped one by one.
fn lenient_list<T: DeserializeOwned>(record: &Map<String, Value>, key: &str) -> Vec<T> {
    let Some(items) = record.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("CanonicalParser: Skipping entry in '{key}': {e}");
                None
            }
        })
        .collect()
}

fn lenient_names(record: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let names: Vec<String> = lenient_list(record, key);
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Reads this application's JSON export, in array or single-object form.
pub struct CanonicalParser;

impl RecipeParser for CanonicalParser {
    fn parse(&self, input: &[u8]) -> Result<Vec<ParsedRecipe>> {
        let root: Value = serde_json::from_slice(input)
            .map_err(|e| ImportError::DecodeError(format!("invalid JSON: {e}")))?;

        let records = match &root {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            Value::Object(_) => vec![&root],
            _ => {
                return Err(ImportError::DecodeError(
                    "expected a recipe or an array of recipes".to_string(),
                ))
            }
        };

        debug!("CanonicalParser: Decoded {} records", records.len());
        Ok(records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match record.as_object() {
                Some(fields) => Some(CanonicalRecipe::from_json(fields).into_parsed()),
                None => {
                    debug!("CanonicalParser: Skipping record {index}, not an object");
                    None
                }
            })
            .collect())
    }
}
