mod model;
pub use model::*;

mod record;
pub use record::*;

mod sqlite_queries;
pub use sqlite_queries::*;
