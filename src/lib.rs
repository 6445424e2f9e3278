//! scriptorium - versioned collection publishing core
//!
//! Users author aliases and snippets, group them into collections, publish
//! immutable versions, and install collections personally or server-wide.
//! The crate owns version history, permissioning, subscription resolution,
//! and an eventually-consistent search index; HTTP, auth-token validation,
//! and the store/search drivers live outside and plug in through capability
//! traits.

pub mod config;
pub mod errors;
pub mod model;
pub mod observability;
pub mod outbox;
pub mod perms;
pub mod publish;
pub mod search;
pub mod store;
pub mod subs;
pub mod workshop;

pub use errors::{WorkshopError, WorkshopResult};
pub use workshop::Workshop;
