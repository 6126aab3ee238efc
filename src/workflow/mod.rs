/// Workflow definition layer
///
/// Wire types for definitions, SQLite persistence, and the validation pass
/// applied at the API boundary before a definition is saved or executed.

pub mod storage;
pub mod types;
pub mod validate;

pub use storage::{WorkflowMetadata, WorkflowStorage};
pub use types::{Edge, NodeSpec, Position, WorkflowDefinition, TRIGGER_NODE_TYPES};
pub use validate::validate_definition;
