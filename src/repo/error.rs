use thiserror::Error;

use crate::query;

#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred in the underlying SQL database backend (e.g., connection, query execution).
    #[error("backend error :: {0}")]
    BackendError(#[from] sqlx::Error),
    /// A session was requested for a database name that was never configured.
    #[error("unknown database `{0}`")]
    UnknownDatabase(String),
    /// A column holds a type that cannot be represented as a [`query::Value`].
    #[error("unsupported column type `{0}`")]
    UnsupportedColumnType(String),
    /// A statement was issued on a session whose transaction already ended.
    #[error("session on `{0}` is already committed or rolled back")]
    SessionFinished(String),
    /// The query received cannot be compiled (bad field, unsupported operation, bad input)
    #[error("query error :: {0}")]
    QueryError(#[from] query::Error),
}
