//! SQL schema for the recipe store.
//!
//! Reference names and join pairs carry no uniqueness constraint. The
//! persistence engine looks them up before every insert, inside a write
//! transaction opened with `BEGIN IMMEDIATE`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS courses (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    name_key  TEXT NOT NULL      -- lowercased name for case-insensitive lookup
);

CREATE TABLE IF NOT EXISTS categories (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    name_key  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    name_key  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipes (
    id                     TEXT PRIMARY KEY,
    name                   TEXT NOT NULL,
    created_at             TEXT NOT NULL,   -- RFC 3339 UTC
    modified_at            TEXT NOT NULL,
    source                 TEXT,
    source_details         TEXT,
    url                    TEXT,
    introduction           TEXT,
    difficulty             INTEGER NOT NULL DEFAULT 0,
    rating                 INTEGER NOT NULL DEFAULT 0,
    yield_text             TEXT,
    servings               INTEGER,
    directions_json        TEXT NOT NULL DEFAULT '[]',
    ingredients_json       TEXT NOT NULL DEFAULT '[]',
    notes_json             TEXT NOT NULL DEFAULT '[]',
    preparation_times_json TEXT NOT NULL DEFAULT '[]',
    nutrition_json         TEXT,
    image_filename         TEXT,
    course_id              TEXT REFERENCES courses(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS recipe_categories (
    id           TEXT PRIMARY KEY,
    recipe_id    TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    category_id  TEXT NOT NULL REFERENCES categories(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS recipe_tags (
    id         TEXT PRIMARY KEY,
    recipe_id  TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    tag_id     TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS courses_name_key_idx    ON courses(name_key);
CREATE INDEX IF NOT EXISTS categories_name_key_idx ON categories(name_key);
CREATE INDEX IF NOT EXISTS tags_name_key_idx       ON tags(name_key);
CREATE INDEX IF NOT EXISTS recipe_categories_idx   ON recipe_categories(recipe_id, category_id);
CREATE INDEX IF NOT EXISTS recipe_tags_idx         ON recipe_tags(recipe_id, tag_id);

PRAGMA user_version = 1;
";
