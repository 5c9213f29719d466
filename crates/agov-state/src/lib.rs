//! # agov-state — Shared Stores
//!
//! Process-lifetime lookup state, encapsulated as explicit store objects
//! rather than module-level singletons. Each store is cheap to clone (the
//! clones share one `Arc`), so services receive their stores by injection
//! and independent instances never leak state into one another.
//!
//! - [`Store`]: generic keyed store behind a `parking_lot::RwLock`.
//! - [`CommitmentGroupStore`]: per-group commitment sets with a cached root.
//! - [`NullifierLedger`]: atomic check-and-mark of consumed nullifiers.
//!
//! ## Locking
//!
//! Locks are synchronous and never held across an `.await`. Every mutation
//! that must be atomic (check-then-mark, read-validate-update) happens
//! inside a single lock acquisition.

pub mod groups;
pub mod nullifiers;
pub mod store;

pub use groups::{CommitmentGroupStore, Group};
pub use nullifiers::NullifierLedger;
pub use store::Store;
