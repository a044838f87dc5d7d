mod arena;
mod node;
mod tree;
mod validate;

pub use node::{Color, NodeId, NodeRef};
pub use tree::{Iter, Tree};
pub use validate::InvariantViolation;
