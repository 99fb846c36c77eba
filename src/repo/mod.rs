pub mod core;
pub use core::{
    AsExec, Config, Cx, DEFAULT_DATABASE, Database, Engines, Repository, Session,
    SessionProvider, Transactional,
};

mod scope;
pub use scope::{Commit, scoped};

mod facades;
pub use facades::*;

// Exported queries
//
// Models are usually handled through [`FacadeModel`]; the single-statement queries
// are exposed to compose several of them inside one `scoped` unit of work.
pub use sql_models::{
    Model, Record, models_select, raw_execute, raw_fetch, record_insert, records_aggregate,
    records_count, records_delete, records_insert, records_join, records_select, records_update,
};

mod error;
pub use error::Error;

#[cfg(test)]
pub use core::testing;

// Private to module exports

mod sql_models;
