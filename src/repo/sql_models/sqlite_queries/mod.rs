mod compilers;
use compilers::*;

mod builders;

mod records;
pub use records::*;

mod aggregates;
pub use aggregates::*;

mod joins;
pub use joins::*;
