//! Call-site identity and concrete call records.

pub mod call_node;
pub mod identifier;

pub use call_node::{CallNode, CallTree, NodeId};
pub use identifier::{Identifier, RawValue};
