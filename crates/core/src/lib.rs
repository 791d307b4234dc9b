//! indexpack-core
//!
//! Core library for generating compilation index packs: for every compiler
//! invocation, an immutable "unit" record capturing the command line and every
//! input file the compilation transitively depends on, each tagged with a
//! content digest. A downstream code-search pipeline replays analysis against
//! the exact recorded inputs, verified by digest match.
//!
//! This crate defines the unit data model, corpus resolution, digest and
//! dependency-discovery capabilities, the unit builder itself, the on-disk
//! index pack / kzip writer, and a batch orchestrator. All substantive logic
//! lives here so it is fully testable and reusable from multiple frontends.

pub mod batch;
pub mod builder;
pub mod compdb;
pub mod corpus;
pub mod digest;
pub mod discover;
pub mod model;
pub mod pack;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
