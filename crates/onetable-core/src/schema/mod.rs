pub mod constraint;
mod descriptor;
pub mod keys;
pub(crate) mod slots;

pub use constraint::{Constraint, ConstraintError};
pub use descriptor::{NOT_PERSISTED, SchemaDescriptor};
pub use keys::{KeyAssignment, KeyStatementError, MAX_KEY_POSITION};
