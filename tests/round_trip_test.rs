use recipe_import::store::{self, count_references};
use recipe_import::{
    CanonicalRecipe, Category, Course, MemoryImageStore, RecipeImporter, SourceFormat, Tag,
};

const SOURCE: &str = r#"[
  {
    "version": "1.0",
    "name": "Shakshuka",
    "source": "Weeknight Book",
    "sourceDetails": "p. 88",
    "introduction": "Eggs poached in spiced tomato.",
    "difficulty": "medium",
    "rating": "five",
    "yield": "2 pans",
    "servings": 4,
    "course": "Breakfast",
    "categories": ["Eggs", "Vegetarian"],
    "tags": ["one-pan"],
    "directions": [
      {"text": "Sauce", "isHeading": true},
      {"text": "Simmer tomatoes with cumin.", "isHeading": false},
      {"text": "Crack in the eggs and cover.", "isHeading": false}
    ],
    "ingredients": [
      {"text": "6 eggs", "isHeading": false, "isMain": true},
      {"text": "1 can tomatoes", "isHeading": false, "isMain": false}
    ],
    "notes": [{"title": "Tip", "content": "Serve with bread."}],
    "preparationTimes": [{"type": "Cook", "duration": "25 min"}],
    "nutrition": {"calories": 310.0, "protein": 18.5, "servingSize": "1 portion"},
    "image": "iVBORw0KGgoAAAANSUhEUg=="
  },
  {"name": "Toast"}
]"#;

fn importer() -> RecipeImporter {
    RecipeImporter::builder()
        .in_memory()
        .images(MemoryImageStore::new())
        .build()
        .unwrap()
}

#[test]
fn test_export_then_reimport_preserves_recipe_content() {
    let mut importer = importer();
    let first = importer
        .import_bytes(SourceFormat::Canonical, SOURCE.as_bytes())
        .unwrap();
    assert_eq!(first.success_count, 2);

    let exported = importer
        .export_json(Some(first.imported_ids.as_slice()))
        .unwrap();
    let second = importer
        .import_bytes(SourceFormat::Canonical, exported.as_bytes())
        .unwrap();
    assert_eq!(second.success_count, 2);
    assert_eq!(second.failure_count, 0);

    let conn = importer.connection();
    for (old_id, new_id) in first.imported_ids.iter().zip(&second.imported_ids) {
        assert_ne!(old_id, new_id);
        let original = store::load_recipe(conn, old_id).unwrap().unwrap();
        let copy = store::load_recipe(conn, new_id).unwrap().unwrap();

        assert_eq!(copy.name, original.name);
        assert_eq!(copy.directions, original.directions);
        assert_eq!(copy.ingredients, original.ingredients);
        assert_eq!(copy.notes, original.notes);
        assert_eq!(copy.preparation_times, original.preparation_times);
        assert_eq!(copy.nutrition, original.nutrition);
        assert_eq!(copy.difficulty, original.difficulty);
        assert_eq!(copy.rating, original.rating);
        assert_eq!(copy.created_at, original.created_at);
        assert_eq!(copy.categories, original.categories);
        assert_eq!(copy.tags, original.tags);
        assert_eq!(copy.course, original.course);
        assert_eq!(copy.course_id, original.course_id);
        assert_eq!(
            copy.image_filename.is_some(),
            original.image_filename.is_some()
        );
    }

    // references were reused, not duplicated
    assert_eq!(count_references::<Category>(conn).unwrap(), 2);
    assert_eq!(count_references::<Tag>(conn).unwrap(), 1);
    assert_eq!(count_references::<Course>(conn).unwrap(), 1);
}

#[test]
fn test_exported_json_shape() {
    let mut importer = importer();
    let summary = importer
        .import_bytes(SourceFormat::Canonical, SOURCE.as_bytes())
        .unwrap();

    let exported = importer.export_json(None).unwrap();
    let recipes: Vec<CanonicalRecipe> = serde_json::from_str(&exported).unwrap();
    assert_eq!(recipes.len(), summary.success_count);

    let shakshuka = &recipes[0];
    assert_eq!(shakshuka.version, "1.0");
    assert_eq!(shakshuka.image.as_deref(), Some("iVBORw0KGgoAAAANSUhEUg=="));
    assert_eq!(
        shakshuka.categories,
        Some(vec!["Eggs".to_string(), "Vegetarian".to_string()])
    );

    let raw: serde_json::Value = serde_json::from_str(&exported).unwrap();
    let toast = &raw[1];
    assert_eq!(toast["name"], "Toast");
    for absent in ["course", "categories", "image", "difficulty", "nutrition"] {
        assert!(toast.get(absent).is_none(), "{absent} should be omitted");
    }
}
