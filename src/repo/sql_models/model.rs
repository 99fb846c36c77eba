//! This module defines the contract a record type fulfills to be handled by the
//! model helpers.
//!
//! A model maps one table: it declares the table name, the logical database it lives
//! in, its primary key and the columns written on insert. Reading whole models back
//! goes through [`sqlx::FromRow`], usually derived.

use sqlx::sqlite::SqliteRow;

use crate::{query, repo};

pub trait Model: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin {
    /// Name of the mapped table.
    const TABLE: &'static str;

    /// Logical database holding the table.
    const DATABASE: &'static str = repo::DEFAULT_DATABASE;

    /// Column used to order and count rows when paginating.
    const PRIMARY_KEY: &'static str = "id";

    /// Columns written by an insert, in the same order as [`Model::values`].
    fn columns() -> &'static [&'static str];

    /// Values of [`Model::columns`] for this instance.
    fn values(&self) -> Vec<query::Value>;

    /// Column of this model qualified by its table name, e.g. for joins.
    fn column(name: &str) -> query::Column {
        query::Column::qualified(Self::TABLE, name)
    }
}
