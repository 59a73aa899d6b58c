//! # Story Graph
//!
//! The data model for branching stories: story and choice nodes, the store
//! that owns them, and the typed schema the authoring markup is read into.
//! This crate holds no synchronization or playback logic.

pub mod authoring;
pub mod node;
pub mod store;

pub use authoring::*;
pub use node::*;
pub use store::*;
