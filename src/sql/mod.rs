//! Safe SQL builder: identifiers from the catalog only, values as parameters.

mod builder;
pub mod params;
pub mod predicate;
pub use builder::*;
pub use params::*;
pub use predicate::{CmpOp, Operand, Predicate};
