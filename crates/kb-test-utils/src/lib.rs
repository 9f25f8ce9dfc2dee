//! Shared test utilities for the Knowledge Sync workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each grow their own fakes. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`store`]: [`InMemoryStore`], a scriptable `KnowledgeStore`
//! - [`clock`]: [`ManualClock`], virtual time for retry and polling tests
//! - [`dir`]: [`KnowledgeDir`] builder for local document trees
//! - [`api`]: [`FakeKnowledgeApi`], an HTTP server speaking the knowledge API

pub mod api;
pub mod clock;
pub mod dir;
pub mod store;

pub use api::{FAKE_API_KEY, FakeKnowledgeApi, FakeState};
pub use clock::ManualClock;
pub use dir::KnowledgeDir;
pub use store::{IndexingBehavior, InMemoryStore, StoreCall, StoredDocument};
