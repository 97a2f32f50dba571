pub mod customer;
pub mod outcome;
mod registry;

pub use customer::{customer_registry, register_customer_tools};
pub use registry::ToolRegistry;
