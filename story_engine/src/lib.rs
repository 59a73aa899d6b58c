//! # Story Engine
//!
//! Plays branching stories authored as keyed records. This crate turns an
//! authored source into a stable node graph, walks it one node at a time, and
//! saves and restores a player's place in it.
//!
//! ## Core Components
//!
//! - **synchronizer**: Reconciles authored records with the cached graph, keeping node IDs stable
//! - **layout**: Places nodes on a 2D canvas for editing tools
//! - **traversal**: Playback state machine with history and choice ledger
//! - **persistence**: Save records, save slots, and the graph cache
//! - **session**: One chapter being played, the surface a game front end uses
//! - **reveal**: Typewriter-style text reveal
//! - **config**: Engine settings read from TOML
//!
//! ## Design Philosophy
//!
//! - **Key-Driven**: Authors and saves refer to nodes by external key; IDs never leave the engine
//! - **Strict Loading**: A malformed graph or stale save is reported, never silently repaired
//! - **Forgiving Play**: Invalid player actions are ignored and leave the state untouched

pub mod config;
pub mod layout;
pub mod persistence;
pub mod reveal;
pub mod session;
pub mod synchronizer;
pub mod traversal;

pub use config::*;
pub use layout::*;
pub use persistence::*;
pub use reveal::*;
pub use session::*;
pub use synchronizer::*;
pub use traversal::*;
