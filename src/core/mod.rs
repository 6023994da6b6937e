//! core
//!
//! Core domain types, persistence and staging for eventforge.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ObjectId, ObjectClass, ManagedKind, AssetPath
//! - [`ids`] - Object id minting
//! - [`object`] - The generic graph object
//! - [`xml`] - Document parsing and serialization
//! - [`graph`] - Parent-pointer hierarchies
//! - [`store`] - The project store and its per-kind indices
//! - [`staging`] - Pending records and topological commit
//! - [`ops`] - Operation journaling and locking
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Project directory layout
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid ids and paths at construction
//! - Objects are generic; per-class behavior lives in small schema tables
//! - Nothing is cached that could go stale between calls

pub mod config;
pub mod graph;
pub mod ids;
pub mod object;
pub mod ops;
pub mod paths;
pub mod staging;
pub mod store;
pub mod types;
pub mod xml;
