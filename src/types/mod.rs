//! Module containing various type definitions used across the codebase.

mod time;
pub use time::*;
