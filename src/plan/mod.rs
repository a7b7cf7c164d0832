pub mod schema;
pub mod store;

#[cfg(test)]
mod tests;

pub use schema::{Bindings, PlanError};
pub use store::{Plan, create_empty_plan, get_plan, plan_path};
