//! eventforge - object-graph persistence and event templating for XML audio
//! middleware projects
//!
//! A project is a directory of XML documents, each holding one or more
//! typed objects with named properties and named relationships to other
//! objects. eventforge reads that graph, stages new folders, banks, buses and
//! asset folders and commits them parents first, and creates new events by
//! structurally copying a template event and grafting media onto the copy.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, the XML codec, the project store, staging and
//!   commit, configuration, journaling and locking
//! - [`instantiate`] - Template event instantiation and media grafting
//! - [`cli`] - The `ef` command-line host
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Every object id is unique across the project, pending records included
//! 2. A managed object is written only after its parent exists on disk
//! 3. Existing object documents are never overwritten
//! 4. A failed instantiation leaves no new files behind

pub mod cli;
pub mod core;
pub mod instantiate;
pub mod ui;
