//! Runtime type identity and the subtype index used by handler discovery.
//!
//! Rust has no inheritance, so "message type B extends A" is declared once at
//! startup: the sub type holds the base by composition (`AsRef<Base>`) and the
//! relation is recorded in a [`TypeHierarchy`]. Discovery then answers
//! "which of the types a handler consumes can this message be seen as?"
//! against that index instead of reflecting over types at dispatch time.
//!
//! ```text
//!   OrderEvent  <── extends ──  OrderShipped  <── extends ──  ExpressShipped
//!        ▲
//!        └── a handler consuming OrderEvent receives &OrderEvent
//!            borrowed out of the ExpressShipped value
//! ```

mod hierarchy;
mod key;

pub use hierarchy::{TypeHierarchy, TypeHierarchyBuilder, Upcast, UpcastPath};
pub use key::TypeKey;
