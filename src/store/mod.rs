//! SQLite-backed relational store for recipes and their references.

use crate::error::Result;
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;

mod recipes;
mod references;
mod schema;

pub use recipes::{
    count_recipes, insert_recipe, list_recipe_ids, load_recipe, set_recipe_course,
    set_recipe_image,
};
pub use references::{
    count_links, count_references, find_by_name, insert_link, insert_reference, link_exists,
    linked_names, list_links, list_references, name_key, Link, Reference,
};
pub use schema::SCHEMA;

/// Opens (or creates) a store at `path` and runs schema initialisation.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
    init_schema(&conn)?;
    debug!("Store: Opened {}", path.display());
    Ok(conn)
}

/// Opens an in-memory store, useful for testing.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Starts a write transaction that holds the database write lock from its
/// first statement, so lookup-then-insert sequences cannot interleave with
/// another writer.
pub fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}
