mod facade_error;
pub use facade_error::*;

mod facade_model;
pub use facade_model::*;
