pub mod error;
pub mod registry;
pub mod schema;
pub mod toolkit;
pub mod toolkits;

pub use error::ToolkitError;
pub use registry::ToolkitRegistry;
pub use schema::{InputSchema, ToolSchema, ToolSpec};
pub use toolkit::{ToolkitDefinition, ToolkitId, ToolkitSpec};
