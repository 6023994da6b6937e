//! core::ops
//!
//! Operation journaling and locking.
//!
//! # Modules
//!
//! - [`journal`] - Operation journal for crash safety and rollback
//! - [`lock`] - Exclusive project lock for hosts
//!
//! # Architecture
//!
//! Every mutating core operation (`commit_all`, `instantiate`):
//! 1. Creates an operation journal before its first write
//! 2. Records each created file once it exists
//! 3. On success: marks the journal committed and removes it (unless
//!    journals are kept by configuration)
//! 4. On failure: `instantiate` removes the journaled files and marks the
//!    journal rolled back; `commit_all` keeps what it wrote
//!
//! The lock is a host concern; the CLI holds it around mutating commands.

pub mod journal;
pub mod lock;

pub use journal::{Journal, JournalError, OpId, OpPhase, StepKind};
pub use lock::{LockError, ProjectLock};
