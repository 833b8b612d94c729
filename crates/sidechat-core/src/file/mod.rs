//! Workspace file context: references, classification, ranking.
//!
//! # Module Structure
//!
//! - `model`: `AttachedFileRef`, `FileContent`, `FileType`, `ResolvedFile`
//! - `classify`: extension/name based text-image-binary classification
//! - `ranking`: search result ordering and capping
//! - `resolver`: the `FileContextResolver` trait implemented by infrastructure

mod classify;
mod model;
mod ranking;
mod resolver;

pub use classify::{binary_placeholder, classify_path, image_placeholder};
pub use model::{AttachedFileRef, FileContent, FileKind, FileType, ResolvedFile};
pub use ranking::{MAX_SEARCH_RESULTS, Relevance, rank_matches};
pub use resolver::FileContextResolver;
