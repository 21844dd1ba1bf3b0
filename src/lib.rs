//! Playgraph - identity resolution and graph assembly for open-source app datasets
//!
//! Playgraph reconciles several independently produced, partially overlapping,
//! and occasionally corrupted tabular/JSON data sources into one consistent
//! dataset describing open-source applications and their version-control
//! repositories, and maps the result onto a property-graph model.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to operations)
//! - [`core`] - Domain types, canonical records, and run reporting
//! - [`normalize`] - Per-layer field schemas, encoding repair, scalar coercion
//! - [`consolidate`] - Identity index and the ordered layer fold
//! - [`matching`] - Package-to-repository match resolution
//! - [`forks`] - Fork relationship derivation
//! - [`emit`] - Graph-store node/relationship mapping and the upsert boundary
//! - [`play`] - App-store detail records and category augmentation
//! - [`tabular`] - Delimited-text reading and writing (RFC 4180)
//!
//! # Correctness Invariants
//!
//! 1. Repository ids are globally unique and never reused
//! 2. A record flagged `not_found` is terminal - excluded from matching and
//!    fork derivation
//! 3. Rename chains resolve to exactly one terminal record; cycles are
//!    structural errors that exclude only the affected chain
//! 4. A package resolves to at most one repository; ambiguity is surfaced,
//!    never guessed away
//! 5. Consolidation is a deterministic fold - in-layer row order never
//!    changes the canonical set

pub mod cli;
pub mod consolidate;
pub mod core;
pub mod emit;
pub mod forks;
pub mod matching;
pub mod normalize;
pub mod play;
pub mod tabular;
