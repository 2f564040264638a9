pub mod handler;
pub mod machine;
pub mod parse_tree;
pub(crate) mod stack;

pub use handler::{ErrorLocatingHandler, MachineHandler, NopHandler};
pub use machine::Machine;
pub use parse_tree::ParseNode;
