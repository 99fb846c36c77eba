//! This module defines the intermediate representation (IR) used to describe the
//! filters, projections and windows of the model helpers, and the compiler turning
//! filters into parameterised SQL clauses.
mod filter;
pub use filter::*;

mod select;
pub use select::*;

mod builder;
pub use builder::*;

mod paging;
pub use paging::*;

mod error;
pub use error::*;
