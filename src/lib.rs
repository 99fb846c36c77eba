//! Create, read, update, delete, aggregate, join and pagination helpers for
//! `sqlx` models, each call running as one session-scoped transaction.
//!
//! Databases are declared on [`repo::Engines`], models implement [`repo::Model`] and
//! are handled through [`repo::FacadeModel`]. Filters and projections are described
//! with the [`query`] module.

pub mod params;
pub mod query;
pub mod repo;
pub mod types;
pub mod utils;
