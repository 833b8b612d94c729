use super::model::AttachedFileRef;

/// Maximum number of entries a search returns.
pub const MAX_SEARCH_RESULTS: usize = 20;

/// How well a file name matches a query. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Relevance {
    /// The name is the query, with or without extensions (`foo`, `foo.ts`).
    Exact,
    /// Name contains the query.
    NameMatch,
    /// Matched through a parent directory only.
    PathOnly,
}

impl Relevance {
    /// `query_lower` must already be lowercased.
    pub fn of(name: &str, query_lower: &str) -> Self {
        let name = name.to_lowercase();
        let is_exact = name
            .strip_prefix(query_lower)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));

        if is_exact {
            Relevance::Exact
        } else if name.contains(query_lower) {
            Relevance::NameMatch
        } else {
            Relevance::PathOnly
        }
    }
}

/// Orders matches and caps them at `limit`.
///
/// Entries whose name contains `query` (case-insensitive) always come before
/// entries that don't, and among those a file named exactly `query` leads.
/// Otherwise entries are alphabetical by name; the relative path breaks ties.
pub fn rank_matches(
    query: &str,
    mut matches: Vec<AttachedFileRef>,
    limit: usize,
) -> Vec<AttachedFileRef> {
    let query_lower = query.to_lowercase();

    matches.sort_by_cached_key(|file| {
        (
            Relevance::of(&file.name, &query_lower),
            file.name.to_lowercase(),
            file.relative_path.clone(),
        )
    });
    matches.dedup_by(|a, b| a.path == b.path);
    matches.truncate(limit);
    matches
}
