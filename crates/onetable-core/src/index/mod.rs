mod registry;
mod select;

pub use registry::{IndexRegistry, IndexSetupError};
pub use select::{QueryShape, SelectError, Selection, select_index};
