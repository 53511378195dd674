//! List queries: the caller-facing query object, expression-name aliasing,
//! and the plan builder that turns a selected index into a store request.

mod list;
mod names;
mod plan;
mod reserved;

pub use list::{KeyOp, ListQuery};
pub use names::ExpressionNames;
pub use plan::{PageLimits, PlanBuilder, PlanError, QueryPlan};
pub use reserved::is_reserved;
