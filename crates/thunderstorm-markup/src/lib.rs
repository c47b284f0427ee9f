//! ThunderStorm markup documents
//!
//! Engine data (screens, materials, sprite sheets, key maps) is stored as a
//! small brace-structured markup in UTF-16 text files:
//!
//! ```text
//! screen
//! {
//! 	name: "main"
//! 	size: 640, 480
//! 	layer 1 { visible: true }
//! }
//! ```
//!
//! - `variable` : typed scalar values and their text forms
//! - `enums`    : name tables for enum and flag values
//! - `tree`     : the element arena and its lookups
//! - `parser` / `writer` : text in and out
//! - `document` : `InfoFile`, a tree bound to a file

pub mod document;
pub mod enums;
pub mod parser;
pub mod tree;
pub mod variable;
pub mod writer;

pub use document::InfoFile;
pub use enums::{enum_name, enum_value, enum_value_or, EnumEntry};
pub use tree::{ChildQuery, ElemId, ElemRef, ElemShape, InfoElem, InfoTree};
pub use variable::{VarType, Variable};
