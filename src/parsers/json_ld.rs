use super::RecipeParser;
use crate::error::Result;
use crate::model::{
    Direction, DraftOrigin, Ingredient, Note, NutritionInformation, ParsedRecipe, PreparationTime,
    Rating, RecipeDraft, SideData,
};
use crate::text::{first_integer, format_duration, parse_numeric_measurement};
use chrono::{DateTime, NaiveDate, Utc};
use html_escape::decode_html_entities;
use log::debug;
use scraper::{Html, Selector};
use serde_json::Value;

/// Extracts schema.org `Recipe` objects from the JSON-LD blocks of a page.
#[derive(Debug, Clone, Default)]
pub struct JsonLdParser {
    /// Address the page was fetched from, recorded on each draft
    pub page_url: Option<String>,
}

impl JsonLdParser {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            page_url: Some(url.into()),
        }
    }

    /// Parses an already decoded HTML string.
    pub fn parse_html(&self, html: &str) -> Vec<ParsedRecipe> {
        let document = Html::parse_document(html);
        let selector = match Selector::parse("script[type='application/ld+json']") {
            Ok(selector) => selector,
            Err(e) => {
                debug!("JsonLdParser: Invalid selector: {e}");
                return Vec::new();
            }
        };

        let scripts: Vec<_> = document.select(&selector).collect();
        debug!("JsonLdParser: Found {} JSON-LD script tags", scripts.len());

        let mut recipes = Vec::new();
        for (index, script) in scripts.iter().enumerate() {
            let raw_json: String = script.text().collect();
            let Some(json_ld) = parse_block(&raw_json) else {
                debug!("JsonLdParser: Skipping unparseable JSON-LD block {index}");
                continue;
            };

            for candidate in recipe_objects(&json_ld) {
                let parsed = self.convert_to_draft(candidate);
                debug!("JsonLdParser: Found recipe '{}' in block {index}", parsed.draft.name);
                recipes.push(parsed);
            }
        }

        recipes
    }

    fn convert_to_draft(&self, recipe: &Value) -> ParsedRecipe {
        let mut draft = RecipeDraft::new(field_text(recipe, "name").unwrap_or_default());

        if let Some(created) = recipe.get("datePublished").and_then(parse_date) {
            draft.created_at = created;
            draft.modified_at = created;
        }
        if let Some(modified) = recipe.get("dateModified").and_then(parse_date) {
            draft.modified_at = modified;
        }

        draft.introduction = recipe.get("description").and_then(description_text);
        draft.source = recipe.get("author").and_then(author_names);
        draft.url = field_text(recipe, "url").or_else(|| self.page_url.clone());

        if let Some(yield_value) = recipe.get("recipeYield") {
            let (yield_text, servings) = parse_yield(yield_value);
            draft.yield_text = yield_text;
            draft.servings = servings;
        }

        if let Some(score) = recipe
            .get("aggregateRating")
            .and_then(|rating| rating.get("ratingValue"))
            .and_then(number_of)
        {
            draft.rating = Rating::from_score(score);
        }

        if let Some(instructions) = recipe.get("recipeInstructions") {
            collect_instructions(instructions, &mut draft.directions);
        }

        draft.ingredients = recipe
            .get("recipeIngredient")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(decode_html_symbols)
                    .filter(|item| !item.is_empty())
                    .map(Ingredient::item)
                    .collect()
            })
            .unwrap_or_default();

        for (key, label) in [("prepTime", "Prep"), ("cookTime", "Cook"), ("totalTime", "Total")] {
            if let Some(duration) = field_text(recipe, key) {
                draft.preparation_times.push(PreparationTime {
                    label: label.to_string(),
                    duration: format_duration(&duration),
                });
            }
        }

        for (key, title) in [
            ("keywords", "Keywords"),
            ("recipeCategory", "Category"),
            ("recipeCuisine", "Cuisine"),
        ] {
            if let Some(content) = recipe.get(key).and_then(joined_text) {
                draft.notes.push(Note {
                    title: title.to_string(),
                    content,
                });
            }
        }

        draft.nutrition = recipe.get("nutrition").and_then(parse_nutrition);

        let mut side = SideData::new(DraftOrigin::SchemaOrg);
        side.image_url = recipe.get("image").and_then(first_image_url);

        ParsedRecipe { draft, side }
    }
}

impl RecipeParser for JsonLdParser {
    fn parse(&self, input: &[u8]) -> Result<Vec<ParsedRecipe>> {
        Ok(self.parse_html(&String::from_utf8_lossy(input)))
    }
}

fn decode_html_symbols(text: &str) -> String {
    // for some reason need to decode twice to get the correct string
    decode_html_entities(&decode_html_entities(text))
        .trim()
        .to_string()
}

fn parse_block(raw_json: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw_json.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("JsonLdParser: Strict parse failed ({e}), trying repaired JSON");
            serde_json::from_str::<Value>(&sanitize_json(raw_json)).ok()
        }
    }
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(kind)) => kind == "Recipe",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind.as_str() == Some("Recipe")),
        _ => false,
    }
}

/// Recipe objects at the top level, inside a top-level array, or in `@graph`.
fn recipe_objects(json_ld: &Value) -> Vec<&Value> {
    fn from_object<'a>(value: &'a Value, found: &mut Vec<&'a Value>) {
        if is_recipe_type(value) {
            found.push(value);
        }
        if let Some(graph) = value.get("@graph").and_then(Value::as_array) {
            found.extend(graph.iter().filter(|item| is_recipe_type(item)));
        }
    }

    let mut found = Vec::new();
    match json_ld {
        Value::Array(items) => {
            for item in items {
                from_object(item, &mut found);
            }
        }
        Value::Object(_) => from_object(json_ld, &mut found),
        _ => {}
    }
    found
}

fn string_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => decode_html_symbols(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn field_text(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(string_of)
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric_measurement(s),
        _ => None,
    }
}

/// A string, or an array of strings joined with `", "`.
fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(string_of).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        other => string_of(other),
    }
}

fn description_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => field_text(value, "text"),
        other => string_of(other),
    }
}

fn author_names(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => string_of(value),
        Value::Object(_) => field_text(value, "name"),
        Value::Array(authors) => {
            let names: Vec<String> = authors
                .iter()
                .filter_map(|author| match author {
                    Value::Object(_) => field_text(author, "name"),
                    other => string_of(other),
                })
                .collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        }
        _ => None,
    }
}

fn parse_yield(value: &Value) -> (Option<String>, Option<u32>) {
    match value {
        Value::Number(n) => {
            let servings = n.as_u64().and_then(|n| u32::try_from(n).ok()).filter(|n| *n > 0);
            (Some(n.to_string()), servings)
        }
        Value::String(_) => {
            let text = string_of(value);
            let servings = text.as_deref().and_then(first_integer).filter(|n| *n > 0);
            (text, servings)
        }
        // sites often repeat the yield as ["4", "4 servings"]; take the wordier one
        Value::Array(items) => items
            .iter()
            .find(|item| item.as_str().is_some_and(|s| s.contains(char::is_alphabetic)))
            .or_else(|| items.first())
            .map(parse_yield)
            .unwrap_or((None, None)),
        _ => (None, None),
    }
}

fn collect_instructions(value: &Value, directions: &mut Vec<Direction>) {
    match value {
        Value::String(s) => {
            for line in s.lines() {
                let step = decode_html_symbols(line);
                if !step.is_empty() {
                    directions.push(Direction::step(step));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => {
                        let step = decode_html_symbols(s);
                        if !step.is_empty() {
                            directions.push(Direction::step(step));
                        }
                    }
                    other => collect_instructions(other, directions),
                }
            }
        }
        Value::Object(_) => {
            if let Some(steps) = value.get("itemListElement") {
                if let Some(name) = field_text(value, "name") {
                    directions.push(Direction::heading(name));
                }
                collect_instructions(steps, directions);
            } else if let Some(text) = field_text(value, "text").or_else(|| field_text(value, "name")) {
                directions.push(Direction::step(text));
            }
        }
        _ => {}
    }
}

fn parse_nutrition(value: &Value) -> Option<NutritionInformation> {
    let field = |key: &str| value.get(key).and_then(number_of);

    let nutrition = NutritionInformation {
        calories: field("calories"),
        carbohydrates: field("carbohydrateContent"),
        cholesterol: field("cholesterolContent"),
        fat: field("fatContent"),
        saturated_fat: field("saturatedFatContent"),
        trans_fat: field("transFatContent"),
        unsaturated_fat: field("unsaturatedFatContent"),
        fiber: field("fiberContent"),
        protein: field("proteinContent"),
        sodium: field("sodiumContent"),
        sugar: field("sugarContent"),
        potassium: field("potassiumContent"),
        calcium: field("calciumContent"),
        iron: field("ironContent"),
        vitamin_a: field("vitaminAContent"),
        vitamin_c: field("vitaminCContent"),
        vitamin_d: field("vitaminDContent"),
        serving_size: field_text(value, "servingSize"),
    };

    if nutrition.has_core_value() {
        Some(nutrition)
    } else {
        debug!("JsonLdParser: Dropping nutrition block without core values");
        None
    }
}

fn first_image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => string_of(value),
        Value::Object(_) => field_text(value, "url"),
        Value::Array(items) => items.iter().find_map(first_image_url),
        _ => None,
    }
}

pub(super) fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Repairs the sloppy JSON some sites emit: missing commas between members,
/// doubled or trailing commas, and insignificant whitespace.
fn sanitize_json(json_str: &str) -> String {
    let mut repaired = String::with_capacity(json_str.len());
    let mut containers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut string_is_key = false;
    // set right after a string value or a closing bracket
    let mut after_value = false;

    for c in json_str.trim().chars() {
        if in_string {
            repaired.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                after_value = !string_is_key;
            }
            continue;
        }

        match c {
            '"' => {
                if after_value {
                    repaired.push(',');
                }
                string_is_key = containers.last() == Some(&'{')
                    && matches!(repaired.chars().last(), Some('{') | Some(','));
                in_string = true;
                after_value = false;
                repaired.push(c);
            }
            '{' | '[' => {
                if after_value {
                    repaired.push(',');
                }
                containers.push(c);
                after_value = false;
                repaired.push(c);
            }
            '}' | ']' => {
                if repaired.ends_with(',') {
                    repaired.pop();
                }
                containers.pop();
                after_value = true;
                repaired.push(c);
            }
            ',' => {
                if !matches!(repaired.chars().last(), Some(',') | Some('{') | Some('[') | None) {
                    repaired.push(c);
                }
                after_value = false;
            }
            c if c.is_whitespace() => {}
            _ => {
                after_value = false;
                repaired.push(c);
            }
        }
    }

    debug!("Sanitized JSON: {repaired}");
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_html_document(blocks: &[&str]) -> String {
        let scripts: String = blocks
            .iter()
            .map(|json_ld| format!(r#"<script type="application/ld+json">{json_ld}</script>"#))
            .collect();
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                {scripts}
            </head>
            <body></body>
            </html>
            "#
        )
    }

    fn parse_one(json_ld: &str) -> ParsedRecipe {
        let mut parsed = JsonLdParser::for_url("http://example.com/recipe")
            .parse_html(&create_html_document(&[json_ld]));
        assert_eq!(parsed.len(), 1);
        parsed.remove(0)
    }

    #[test]
    fn test_parse_basic_recipe() {
        let json_ld = r#"
        {
            "@context": "https://schema.org/",
            "@type": "Recipe",
            "name": "Chocolate Chip Cookies",
            "description": "Delicious homemade cookies",
            "image": "https://example.com/cookie.jpg",
            "recipeIngredient": ["flour", " sugar ", "chocolate chips", "  "],
            "recipeInstructions": "Mix ingredients.\nBake at 350F for 10 minutes.",
            "author": "Jane Doe",
            "prepTime": "PT15M",
            "cookTime": "PT10M",
            "totalTime": "PT1H25M",
            "recipeYield": "24 cookies",
            "recipeCategory": "Dessert",
            "recipeCuisine": "American",
            "keywords": "chocolate, cookies, baking"
        }
        "#;
        let ParsedRecipe { draft, side } = parse_one(json_ld);

        assert_eq!(draft.name, "Chocolate Chip Cookies");
        assert_eq!(draft.introduction.as_deref(), Some("Delicious homemade cookies"));
        assert_eq!(draft.source.as_deref(), Some("Jane Doe"));
        assert_eq!(draft.url.as_deref(), Some("http://example.com/recipe"));
        assert_eq!(draft.yield_text.as_deref(), Some("24 cookies"));
        assert_eq!(draft.servings, Some(24));
        assert_eq!(
            draft.ingredients,
            vec![
                Ingredient::item("flour"),
                Ingredient::item("sugar"),
                Ingredient::item("chocolate chips"),
            ]
        );
        assert_eq!(
            draft.directions,
            vec![
                Direction::step("Mix ingredients."),
                Direction::step("Bake at 350F for 10 minutes."),
            ]
        );
        let times: Vec<(&str, &str)> = draft
            .preparation_times
            .iter()
            .map(|t| (t.label.as_str(), t.duration.as_str()))
            .collect();
        assert_eq!(
            times,
            vec![("Prep", "15 min"), ("Cook", "10 min"), ("Total", "1 hr 25 min")]
        );
        let notes: Vec<(&str, &str)> = draft
            .notes
            .iter()
            .map(|n| (n.title.as_str(), n.content.as_str()))
            .collect();
        assert_eq!(
            notes,
            vec![
                ("Keywords", "chocolate, cookies, baking"),
                ("Category", "Dessert"),
                ("Cuisine", "American"),
            ]
        );
        assert_eq!(draft.nutrition, None);
        assert_eq!(side.origin, DraftOrigin::SchemaOrg);
        assert_eq!(side.image_url.as_deref(), Some("https://example.com/cookie.jpg"));
        assert_eq!(side.course, None);
        assert_eq!(side.categories, None);
    }

    #[test]
    fn test_only_recipe_blocks_yield_drafts() {
        let website = r#"{"@context": "https://schema.org", "@type": "WebSite", "name": "Food Blog"}"#;
        let recipe = r#"{"@context": "https://schema.org", "@type": "Recipe", "name": "Pancakes"}"#;
        let parsed = JsonLdParser::default().parse_html(&create_html_document(&[website, recipe]));
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].draft.name, "Pancakes");
        assert_eq!(parsed[0].draft.url, None);
    }

    #[test]
    fn test_type_must_be_exactly_recipe() {
        let lowercase = r#"{"@type": "recipe", "name": "Lower"}"#;
        let listed = r#"{"@type": ["Thing", "Recipe"], "name": "Listed"}"#;
        let parsed = JsonLdParser::default().parse_html(&create_html_document(&[lowercase, listed]));
        let names: Vec<&str> = parsed.iter().map(|p| p.draft.name.as_str()).collect();
        assert_eq!(names, vec!["Listed"]);
    }

    #[test]
    fn test_array_and_graph_containers_yield_every_recipe() {
        let array = r#"[
            {"@type": "Recipe", "name": "First"},
            {"@type": "WebSite", "name": "Site"},
            {"@type": "Recipe", "name": "Second"}
        ]"#;
        let graph = r#"{
            "@context": "https://schema.org",
            "@graph": [
                {"@type": "WebPage", "name": "Page"},
                {"@type": "Recipe", "name": "Third"}
            ]
        }"#;
        let parsed = JsonLdParser::default().parse_html(&create_html_document(&[array, graph]));
        let names: Vec<&str> = parsed.iter().map(|p| p.draft.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let broken = r#"{"@type": "Recipe", "name": "Broken" "#;
        let good = r#"{"@type": "Recipe", "name": "Good"}"#;
        let parsed = JsonLdParser::default().parse_html(&create_html_document(&[broken, good]));
        let names: Vec<&str> = parsed.iter().map(|p| p.draft.name.as_str()).collect();
        assert_eq!(names, vec!["Good"]);
    }

    #[test]
    fn test_missing_comma_is_repaired() {
        let sloppy = r#"{"@type": "Recipe", "name": "Sloppy" "recipeIngredient": ["salt",]}"#;
        let parsed = parse_one(sloppy);
        assert_eq!(parsed.draft.name, "Sloppy");
        assert_eq!(parsed.draft.ingredients, vec![Ingredient::item("salt")]);
    }

    #[test]
    fn test_author_shapes() {
        let object = parse_one(r#"{"@type": "Recipe", "name": "A", "author": {"@type": "Person", "name": "Chef Mario"}}"#);
        assert_eq!(object.draft.source.as_deref(), Some("Chef Mario"));

        let array = parse_one(
            r##"{"@type": "Recipe", "name": "B", "author": [{"name": "Chef One"}, {"name": "Chef Two"}, {"@id": "#x"}]}"##,
        );
        assert_eq!(array.draft.source.as_deref(), Some("Chef One, Chef Two"));

        let id_only = parse_one(r##"{"@type": "Recipe", "name": "C", "author": {"@id": "#person"}}"##);
        assert_eq!(id_only.draft.source, None);
    }

    #[test]
    fn test_yield_shapes() {
        let number = parse_one(r#"{"@type": "Recipe", "name": "A", "recipeYield": 4}"#);
        assert_eq!(number.draft.servings, Some(4));
        assert_eq!(number.draft.yield_text.as_deref(), Some("4"));

        let text = parse_one(r#"{"@type": "Recipe", "name": "B", "recipeYield": "Serves 6"}"#);
        assert_eq!(text.draft.servings, Some(6));

        let array = parse_one(r#"{"@type": "Recipe", "name": "C", "recipeYield": ["12", "12 muffins"]}"#);
        assert_eq!(array.draft.yield_text.as_deref(), Some("12 muffins"));
        assert_eq!(array.draft.servings, Some(12));

        let words = parse_one(r#"{"@type": "Recipe", "name": "D", "recipeYield": "a crowd"}"#);
        assert_eq!(words.draft.servings, None);
        assert_eq!(words.draft.yield_text.as_deref(), Some("a crowd"));
    }

    #[test]
    fn test_instruction_shapes() {
        let strings = parse_one(r#"{"@type": "Recipe", "name": "A", "recipeInstructions": ["Boil water", " ", "Add pasta"]}"#);
        assert_eq!(
            strings.draft.directions,
            vec![Direction::step("Boil water"), Direction::step("Add pasta")]
        );

        let sections = parse_one(
            r#"{"@type": "Recipe", "name": "B", "recipeInstructions": [
                {"@type": "HowToSection", "name": "Sauce", "itemListElement": [
                    {"@type": "HowToStep", "text": "Melt butter"},
                    {"@type": "HowToStep", "text": "Whisk in flour"}
                ]},
                {"@type": "HowToStep", "text": "Serve &amp; enjoy"}
            ]}"#,
        );
        assert_eq!(
            sections.draft.directions,
            vec![
                Direction::heading("Sauce"),
                Direction::step("Melt butter"),
                Direction::step("Whisk in flour"),
                Direction::step("Serve & enjoy"),
            ]
        );
    }

    #[test]
    fn test_non_string_ingredients_are_ignored() {
        let parsed = parse_one(r#"{"@type": "Recipe", "name": "A", "recipeIngredient": "2 eggs"}"#);
        assert!(parsed.draft.ingredients.is_empty());
    }

    #[test]
    fn test_nutrition_mapping() {
        let parsed = parse_one(
            r#"{"@type": "Recipe", "name": "A", "nutrition": {
                "@type": "NutritionInformation",
                "calories": "240 calories",
                "proteinContent": "9g",
                "sodiumContent": "310 mg",
                "fatContent": 12,
                "ironContent": "2 mg",
                "servingSize": "1 slice",
                "sugarContent": "lots"
            }}"#,
        );
        let nutrition = parsed.draft.nutrition.unwrap();
        assert_eq!(nutrition.calories, Some(240.0));
        assert_eq!(nutrition.protein, Some(9.0));
        assert_eq!(nutrition.sodium, Some(310.0));
        assert_eq!(nutrition.fat, Some(12.0));
        assert_eq!(nutrition.iron, Some(2.0));
        assert_eq!(nutrition.sugar, None);
        assert_eq!(nutrition.serving_size.as_deref(), Some("1 slice"));
    }

    #[test]
    fn test_nutrition_without_core_values_is_omitted() {
        let parsed = parse_one(
            r#"{"@type": "Recipe", "name": "A", "nutrition": {"ironContent": "2 mg", "calories": "unknown"}}"#,
        );
        assert_eq!(parsed.draft.nutrition, None);
    }

    #[test]
    fn test_dates_rating_and_image_object() {
        let parsed = parse_one(
            r#"{"@type": "Recipe", "name": "A",
                "datePublished": "2021-03-04T10:00:00+02:00",
                "dateModified": "2022-01-01",
                "aggregateRating": {"ratingValue": "4.7", "ratingCount": 120},
                "image": [{"@type": "ImageObject", "url": "https://example.com/a.jpg"}]}"#,
        );
        assert_eq!(parsed.draft.created_at.to_rfc3339(), "2021-03-04T08:00:00+00:00");
        assert_eq!(parsed.draft.modified_at.to_rfc3339(), "2022-01-01T00:00:00+00:00");
        assert_eq!(parsed.draft.rating, Rating::Five);
        assert_eq!(parsed.side.image_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[test]
    fn test_page_without_json_ld() {
        let parsed = JsonLdParser::default().parse_html("<html><body>Test</body></html>");
        assert!(parsed.is_empty());
    }
}
