//! Domain types and pure logic for the offline-notes annotation backend.
//!
//! Nothing in this crate performs I/O: the annotation data model, the
//! local fallback annotator, the gateway reply normalizer and the
//! in-memory rate guard all live here so the HTTP and gateway crates can
//! share them.

pub mod annotation;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod rate_limit;
pub mod types;
