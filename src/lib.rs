//! Build hierarchical trees from flat, parent-linked records.
//!
//! ```
//! use restree::domain::{RecordId, TreeBuilder};
//! use serde_json::json;
//!
//! let records = vec![
//!     json!({"id": 1, "pid": 0, "title": "Item 1"}),
//!     json!({"id": 2, "pid": 1, "title": "Item 2"}),
//!     json!({"id": 3, "pid": 0, "title": "Item 3"}),
//! ];
//! let mut builder = TreeBuilder::new(records);
//!
//! let tree = builder.build_tree(None);
//! assert_eq!(tree.top_level_ids(), vec![RecordId::Int(1), RecordId::Int(3)]);
//!
//! let titles: Vec<_> = builder
//!     .flatten(None, false)
//!     .iter()
//!     .map(|r| r["title"].as_str().unwrap_or_default().to_string())
//!     .collect();
//! assert_eq!(titles, ["Item 1", "Item 2", "Item 3"]);
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use domain::{LinkFields, Record, RecordId, RelationshipMap, TreeBuilder};
