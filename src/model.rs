use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How hard a recipe is to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    #[default]
    NotSet,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            3 => Difficulty::Hard,
            _ => Difficulty::NotSet,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Difficulty::NotSet => 0,
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Star rating, one to five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    #[default]
    NotSet,
    One,
    Two,
    Three,
    Four,
    Five,
}

impl Rating {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Rating::One,
            2 => Rating::Two,
            3 => Rating::Three,
            4 => Rating::Four,
            5 => Rating::Five,
            _ => Rating::NotSet,
        }
    }

    /// Rounds a fractional score such as `4.6` to the nearest star.
    pub fn from_score(score: f64) -> Self {
        if !score.is_finite() {
            return Rating::NotSet;
        }
        Rating::from_code(score.round().clamp(0.0, 5.0) as i64)
    }

    pub fn code(self) -> i64 {
        match self {
            Rating::NotSet => 0,
            Rating::One => 1,
            Rating::Two => 2,
            Rating::Three => 3,
            Rating::Four => 4,
            Rating::Five => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Direction {
    pub text: String,
    #[serde(default)]
    pub is_heading: bool,
}

impl Direction {
    pub fn step(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: false,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub text: String,
    #[serde(default)]
    pub is_heading: bool,
    #[serde(default)]
    pub is_main: bool,
}

impl Ingredient {
    pub fn item(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: false,
            is_main: false,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_heading: true,
            is_main: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub content: String,
}

/// A labelled duration such as `Prep: 15 min`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationTime {
    #[serde(rename = "type")]
    pub label: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrates: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saturated_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trans_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsaturated_fat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potassium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calcium: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iron: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitamin_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitamin_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitamin_d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
}

impl NutritionInformation {
    /// Whether any of the commonly published values is present.
    ///
    /// Micronutrients alone do not count; a block carrying only those is
    /// treated as noise by the web parser.
    pub fn has_core_value(&self) -> bool {
        self.calories.is_some()
            || self.protein.is_some()
            || self.carbohydrates.is_some()
            || self.fat.is_some()
            || self.fiber.is_some()
            || self.sugar.is_some()
            || self.sodium.is_some()
            || self.cholesterol.is_some()
            || self.serving_size.is_some()
    }
}

/// Transient recipe produced by a parser, consumed once by the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub source: Option<String>,
    pub source_details: Option<String>,
    pub url: Option<String>,
    pub introduction: Option<String>,
    pub difficulty: Difficulty,
    pub rating: Rating,
    pub yield_text: Option<String>,
    pub servings: Option<u32>,
    pub directions: Vec<Direction>,
    pub ingredients: Vec<Ingredient>,
    pub notes: Vec<Note>,
    pub preparation_times: Vec<PreparationTime>,
    pub nutrition: Option<NutritionInformation>,
}

impl RecipeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            modified_at: now,
            source: None,
            source_details: None,
            url: None,
            introduction: None,
            difficulty: Difficulty::NotSet,
            rating: Rating::NotSet,
            yield_text: None,
            servings: None,
            directions: Vec::new(),
            ingredients: Vec::new(),
            notes: Vec::new(),
            preparation_times: Vec::new(),
            nutrition: None,
        }
    }
}

/// Which parser produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    MacGourmet,
    SchemaOrg,
    Canonical,
}

/// Data that can only be resolved once the recipe row exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SideData {
    pub origin: DraftOrigin,
    pub image: Option<Vec<u8>>,
    /// Remote image location, resolved into `image` by the web importer
    pub image_url: Option<String>,
    pub course: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl SideData {
    pub fn new(origin: DraftOrigin) -> Self {
        Self {
            origin,
            image: None,
            image_url: None,
            course: None,
            categories: None,
            tags: None,
        }
    }
}

/// One recipe as returned by a parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecipe {
    pub draft: RecipeDraft,
    pub side: SideData,
}

/// Persisted recipe aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub source: Option<String>,
    pub source_details: Option<String>,
    pub url: Option<String>,
    pub introduction: Option<String>,
    pub difficulty: Difficulty,
    pub rating: Rating,
    pub yield_text: Option<String>,
    pub servings: Option<u32>,
    pub directions: Vec<Direction>,
    pub ingredients: Vec<Ingredient>,
    pub notes: Vec<Note>,
    pub preparation_times: Vec<PreparationTime>,
    pub nutrition: Option<NutritionInformation>,
    pub image_filename: Option<String>,
    pub course_id: Option<String>,
    /// Resolved names, filled when the recipe is loaded with its references
    pub course: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl Recipe {
    /// Base row for a new recipe; image and course are attached afterwards.
    pub fn from_draft(id: String, draft: RecipeDraft) -> Self {
        Self {
            id,
            name: draft.name,
            created_at: draft.created_at,
            modified_at: draft.modified_at,
            source: draft.source,
            source_details: draft.source_details,
            url: draft.url,
            introduction: draft.introduction,
            difficulty: draft.difficulty,
            rating: draft.rating,
            yield_text: draft.yield_text,
            servings: draft.servings,
            directions: draft.directions,
            ingredients: draft.ingredients,
            notes: draft.notes,
            preparation_times: draft.preparation_times,
            nutrition: draft.nutrition,
            image_filename: None,
            course_id: None,
            course: None,
            categories: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeCategory {
    pub id: String,
    pub recipe_id: String,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeTag {
    pub id: String,
    pub recipe_id: String,
    pub tag_id: String,
}
