//! File context resolver trait definition.

use async_trait::async_trait;

use super::model::{AttachedFileRef, FileContent};

/// Finds workspace files and turns them into text-safe chat context.
///
/// Both operations fail soft: I/O problems degrade to an empty result or
/// `None` and are never surfaced to the caller.
#[async_trait]
pub trait FileContextResolver: Send + Sync {
    /// Searches all workspace roots for files loosely matching `*query*`.
    ///
    /// Returns at most [`MAX_SEARCH_RESULTS`](super::MAX_SEARCH_RESULTS)
    /// entries, ranked by [`rank_matches`](super::rank_matches).
    async fn search(&self, query: &str) -> Vec<AttachedFileRef>;

    /// Reads and classifies a single file.
    ///
    /// Returns `None` when `path` is not a regular file or cannot be read.
    async fn resolve(&self, path: &str) -> Option<FileContent>;
}
