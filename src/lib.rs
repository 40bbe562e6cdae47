//! Content-based music recommendations from track text.
//!
//! dscvr turns a catalog of tracks (title, artist, tags) into dense vectors
//! offline, persists them, and answers two questions at serving time: which
//! track does this free-text query mean, and which tracks are most like it.
//!
//! # Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Normalize text | [`catalog`] | canonical lower-case strings |
//! | Fit features | [`embedding`] | `n × d` matrix + encoding model |
//! | Persist | [`artifacts`] | matrix, model, id map, manifest |
//! | Resolve query | [`search`] | fuzzy-matched row |
//! | Rank neighbours | [`recommend`] | cosine top-k with artist cap |
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`error`]: Error kinds shared by the library
//! - [`engine`]: Read-only serving context composing search and recommendation
//! - [`server`]: HTTP routes over the serving context

pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod recommend;
pub mod search;
pub mod server;
