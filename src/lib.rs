#![deny(unsafe_code)]

#[macro_use]
extern crate log;

pub mod comparator;
pub mod rbtree;

pub use comparator::{Comparator, Natural};
pub use rbtree::{Color, InvariantViolation, NodeId, NodeRef, Tree};
