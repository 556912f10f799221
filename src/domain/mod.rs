//! Domain layer: records, trees and the builder that links them
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod relationships;

pub use arena::{NodeKey, NodeRef, PreOrderIterator, TreeArena, TreeNode, TreeView, Visit};
pub use builder::{FlatEntry, TreeBuilder};
pub use entities::{LinkFields, Record, RecordId};
pub use error::{DomainError, DomainResult, FieldError};
pub use relationships::RelationshipMap;
