//! Type tree model for asset bundle object metadata.
//!
//! Every object inside a serialized asset file carries a *type tree*: a nested,
//! heterogeneous document describing its fields (`m_Name`, `m_Width`,
//! `m_StreamData`, ...). This crate models that document as a closed tagged
//! variant ([`Node`]) and provides the substitution walker used to re-identify
//! cloned assets.
//!
//! # Example
//!
//! ```
//! use abk_typetree::Node;
//!
//! # fn main() -> Result<(), abk_typetree::Collision> {
//! let mut tree: Node = [
//!     ("m_Name", Node::from("ui_jacket_001686")),
//!     ("m_Width", Node::from(512)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let rewritten = tree.substitute("_001686", "_002001")?;
//! assert_eq!(rewritten, 1);
//! assert_eq!(tree.get("m_Name").and_then(Node::as_str), Some("ui_jacket_002001"));
//! assert!(!tree.contains_str("_001686"));
//! # Ok(())
//! # }
//! ```

mod node;
mod walker;

pub use node::Node;
pub use walker::{substitute, Collision};
