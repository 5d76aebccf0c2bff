use super::RecipeParser;
use crate::error::{ImportError, Result};
use crate::model::{
    Difficulty, Direction, DraftOrigin, Ingredient, Note, ParsedRecipe, PreparationTime, Rating,
    RecipeDraft, SideData,
};
use crate::text::{directions_from_text, humanize_duration};
use log::debug;
use plist::{Dictionary, Value};
use std::io::Cursor;

/// Placeholder MacGourmet writes when no course was chosen.
pub const NO_COURSE_PLACEHOLDER: &str = "--";

const FALLBACK_LABEL: &str = "Other";

const NOTE_TYPES: &[(i64, &str)] = &[
    (0, "Note"),
    (1, "Tip"),
    (2, "Variation"),
    (3, "Wine Pairing"),
    (4, "Serving Suggestion"),
    (5, "Make Ahead"),
    (6, "Storage"),
    (7, "Nutrition"),
];

const TIME_TYPES: &[(i64, &str)] = &[
    (0, "Prep"),
    (1, "Cook"),
    (2, "Total"),
    (3, "Inactive"),
    (4, "Marinate"),
    (5, "Chill"),
    (6, "Rest"),
    (7, "Bake"),
];

/// Reads the property-list export of the MacGourmet desktop application.
pub struct MacGourmetParser;

impl RecipeParser for MacGourmetParser {
    fn parse(&self, input: &[u8]) -> Result<Vec<ParsedRecipe>> {
        let root = Value::from_reader(Cursor::new(input))
            .map_err(|e| ImportError::DecodeError(format!("invalid property list: {e}")))?;

        let Value::Array(records) = root else {
            return Err(ImportError::DecodeError(
                "property list root is not an array of recipes".to_string(),
            ));
        };

        debug!("MacGourmetParser: Found {} records", records.len());

        Ok(records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match record.as_dictionary() {
                Some(dict) => Some(parse_record(dict)),
                None => {
                    debug!("MacGourmetParser: Skipping record {index}, not a dictionary");
                    None
                }
            })
            .collect())
    }
}

fn parse_record(dict: &Dictionary) -> ParsedRecipe {
    let mut draft = RecipeDraft::new(text(dict, "NAME").unwrap_or_default());
    draft.introduction = text(dict, "SUMMARY");
    draft.source = text(dict, "SOURCE");
    draft.source_details = text(dict, "PUBLICATION_PAGE");
    draft.url = text(dict, "URL");
    draft.yield_text = text(dict, "YIELD");
    draft.difficulty = integer(dict, "DIFFICULTY").map_or(Difficulty::NotSet, Difficulty::from_code);
    draft.rating = integer(dict, "RATING").map_or(Rating::NotSet, Rating::from_code);
    draft.servings = integer(dict, "SERVINGS")
        .filter(|servings| *servings > 0)
        .and_then(|servings| u32::try_from(servings).ok());

    draft.directions = parse_directions(dict);
    draft.ingredients = parse_ingredients(list(dict, "INGREDIENTS_TREE"));
    draft.notes = list(dict, "NOTES_LIST")
        .iter()
        .filter_map(Value::as_dictionary)
        .filter_map(|note| {
            let content = text(note, "NOTE_TEXT")?;
            Some(Note {
                title: lookup_label(NOTE_TYPES, integer(note, "TYPE_ID")).to_string(),
                content,
            })
        })
        .collect();
    draft.preparation_times = list(dict, "PREP_TIMES")
        .iter()
        .filter_map(Value::as_dictionary)
        .filter_map(parse_preparation_time)
        .collect();

    let mut side = SideData::new(DraftOrigin::MacGourmet);
    side.image = match dict.get("IMAGE") {
        Some(Value::Data(bytes)) if !bytes.is_empty() => Some(bytes.clone()),
        _ => None,
    };
    side.course = text(dict, "COURSE_NAME").filter(|name| name != NO_COURSE_PLACEHOLDER);
    side.categories = non_empty(
        list(dict, "CATEGORIES")
            .iter()
            .filter_map(|category| match category {
                Value::Dictionary(entry) => text(entry, "NAME"),
                Value::String(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
                _ => None,
            })
            .collect(),
    );
    side.tags = text(dict, "KEYWORDS").and_then(|keywords| {
        non_empty(
            keywords
                .split(',')
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_string)
                .collect(),
        )
    });

    debug!(
        "MacGourmetParser: Parsed '{}' with {} directions, {} ingredients",
        draft.name,
        draft.directions.len(),
        draft.ingredients.len()
    );

    ParsedRecipe { draft, side }
}

fn parse_directions(dict: &Dictionary) -> Vec<Direction> {
    let entries = list(dict, "DIRECTIONS_LIST");
    if entries.is_empty() {
        return text(dict, "DIRECTIONS")
            .map(|plain| directions_from_text(&plain))
            .unwrap_or_default();
    }

    let mut directions = Vec::new();
    for entry in entries.iter().filter_map(Value::as_dictionary) {
        if let Some(label) = text(entry, "LABEL_TEXT") {
            directions.push(Direction::heading(label));
        }
        if let Some(body) = text(entry, "DIRECTION_TEXT") {
            directions.push(Direction::step(body));
        }
    }
    directions
}

fn parse_ingredients(entries: &[Value]) -> Vec<Ingredient> {
    let mut ingredients = Vec::new();
    for entry in entries.iter().filter_map(Value::as_dictionary) {
        if let Some(ingredient) = compose_ingredient(entry) {
            ingredients.push(ingredient);
        }
        // groups nest their members under the divider
        ingredients.extend(parse_ingredients(list(entry, "INGREDIENTS")));
    }
    ingredients
}

fn compose_ingredient(entry: &Dictionary) -> Option<Ingredient> {
    let description = text(entry, "DESCRIPTION");

    if flag(entry, "IS_DIVIDER") {
        return description.map(Ingredient::heading);
    }

    let mut composed = [
        text(entry, "QUANTITY"),
        text(entry, "MEASUREMENT"),
        description,
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<String>>()
    .join(" ");

    if let Some(note) = text(entry, "DIRECTION") {
        composed = format!("{composed} ({note})").trim().to_string();
    }

    if composed.is_empty() {
        return None;
    }

    Some(Ingredient {
        text: composed,
        is_heading: false,
        is_main: flag(entry, "IS_MAIN"),
    })
}

fn parse_preparation_time(entry: &Dictionary) -> Option<PreparationTime> {
    let hours = integer(entry, "AMOUNT").unwrap_or(0).max(0) as u64;
    let minutes = integer(entry, "AMOUNT_2").unwrap_or(0).max(0) as u64;
    if hours == 0 && minutes == 0 {
        return None;
    }

    Some(PreparationTime {
        label: lookup_label(TIME_TYPES, integer(entry, "TIME_TYPE_ID")).to_string(),
        duration: humanize_duration(hours, minutes),
    })
}

fn lookup_label(table: &[(i64, &'static str)], code: Option<i64>) -> &'static str {
    code.and_then(|code| {
        table
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, label)| *label)
    })
    .unwrap_or(FALLBACK_LABEL)
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn text(dict: &Dictionary, key: &str) -> Option<String> {
    let value = match dict.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        _ => return None,
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn integer(dict: &Dictionary, key: &str) -> Option<i64> {
    match dict.get(key)? {
        Value::Integer(i) => i.as_signed(),
        Value::Real(r) if r.is_finite() => Some(r.trunc() as i64),
        Value::String(s) => s.trim().parse().ok(),
        Value::Boolean(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn flag(dict: &Dictionary, key: &str) -> bool {
    match dict.get(key) {
        Some(Value::Boolean(b)) => *b,
        Some(Value::Integer(i)) => i.as_signed().is_some_and(|i| i != 0),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "true" | "1"
        ),
        _ => false,
    }
}

fn list<'a>(dict: &'a Dictionary, key: &str) -> &'a [Value] {
    dict.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
