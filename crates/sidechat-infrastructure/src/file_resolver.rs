//! Workspace file resolver backed by the local file system.

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use sidechat_core::config::SearchConfig;
use sidechat_core::error::{Result, SidechatError};
use sidechat_core::file::{
    AttachedFileRef, FileContent, FileContextResolver, FileKind, FileType, MAX_SEARCH_RESULTS,
    binary_placeholder, classify_path, image_placeholder, rank_matches,
};

/// Searches and reads files under a fixed set of workspace roots.
pub struct WorkspaceFileResolver {
    roots: Vec<PathBuf>,
    ignored_dirs: Vec<String>,
    max_results: usize,
}

impl WorkspaceFileResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self::from_config(roots, &SearchConfig::default())
    }

    /// `max_results` from the config can lower the cap but never raise it.
    pub fn from_config(roots: Vec<PathBuf>, config: &SearchConfig) -> Self {
        Self {
            roots,
            ignored_dirs: config.ignored_dirs.clone(),
            max_results: config.max_results.min(MAX_SEARCH_RESULTS),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Relative paths resolve against the first root.
    fn absolutize(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        match self.roots.first() {
            Some(root) if candidate.is_relative() => root.join(candidate),
            _ => candidate,
        }
    }
}

#[async_trait]
impl FileContextResolver for WorkspaceFileResolver {
    async fn search(&self, query: &str) -> Vec<AttachedFileRef> {
        if self.roots.is_empty() {
            return Vec::new();
        }

        let roots = self.roots.clone();
        let ignored = self.ignored_dirs.clone();
        let limit = self.max_results;
        let query_owned = query.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            search_roots(&roots, &ignored, &query_owned, limit)
        })
        .await;

        match outcome {
            Ok(Ok(files)) => {
                tracing::debug!("[Resolver] search '{}' -> {} files", query, files.len());
                files
            }
            Ok(Err(e)) => {
                tracing::warn!("[Resolver] search '{}' failed: {}", query, e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("[Resolver] search task for '{}' aborted: {}", query, e);
                Vec::new()
            }
        }
    }

    async fn resolve(&self, path: &str) -> Option<FileContent> {
        let absolute = self.absolutize(path);
        match resolve_file(&absolute).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("[Resolver] could not read {}: {}", absolute.display(), e);
                None
            }
        }
    }
}

/// Reads one file. `Ok(None)` for anything that is not a regular file.
async fn resolve_file(path: &Path) -> Result<Option<FileContent>> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let content = match classify_path(path) {
        FileType::Text => {
            let bytes = tokio::fs::read(path).await?;
            FileContent::text(String::from_utf8_lossy(&bytes).into_owned())
        }
        FileType::Image => FileContent {
            content: image_placeholder(path, metadata.len()),
            file_type: FileType::Image,
        },
        FileType::Binary => FileContent {
            content: binary_placeholder(path, metadata.len()),
            file_type: FileType::Binary,
        },
    };

    Ok(Some(content))
}

fn search_roots(
    roots: &[PathBuf],
    ignored_dirs: &[String],
    query: &str,
    limit: usize,
) -> Result<Vec<AttachedFileRef>> {
    let matcher = build_matcher(query)?;
    let multi_root = roots.len() > 1;
    let mut matches = Vec::new();

    for root in roots {
        let root_label = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !is_ignored_dir(entry, ignored_dirs));

        // Unreadable entries are skipped rather than failing the whole search.
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = to_slash(relative);
            if !matcher.is_match(&relative) {
                continue;
            }

            let relative_path = if multi_root && !root_label.is_empty() {
                format!("{}/{}", root_label, relative)
            } else {
                relative
            };

            matches.push(AttachedFileRef {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path().to_string_lossy().to_string(),
                relative_path,
                kind: FileKind::File,
            });
        }
    }

    Ok(rank_matches(query, matches, limit))
}

/// Case-insensitive `*query*` over the relative path; `*` crosses separators
/// so parent directory names count as loose matches.
fn build_matcher(query: &str) -> Result<GlobMatcher> {
    let pattern = format!("*{}*", globset::escape(query));
    GlobBuilder::new(&pattern)
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| SidechatError::internal(format!("Invalid search pattern '{}': {}", query, e)))
}

fn is_ignored_dir(entry: &DirEntry, ignored_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && ignored_dirs
            .iter()
            .any(|ignored| entry.file_name().to_str() == Some(ignored.as_str()))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn names(files: &[AttachedFileRef]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_ranks_name_hits_first() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/barfoo.ts", b"");
        touch(dir.path(), "foo/zzz.ts", b"");
        touch(dir.path(), "foo.ts", b"");
        touch(dir.path(), "unrelated.ts", b"");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let found = resolver.search("foo").await;

        assert_eq!(names(&found), vec!["foo.ts", "barfoo.ts", "zzz.ts"]);
        assert_eq!(found[1].relative_path, "src/barfoo.ts");
        assert!(Path::new(&found[0].path).is_absolute());
        assert_eq!(found[0].kind, FileKind::File);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ReadMe.md", b"");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        assert_eq!(names(&resolver.search("readme").await), vec!["ReadMe.md"]);
    }

    #[tokio::test]
    async fn test_search_caps_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..100 {
            touch(dir.path(), &format!("match_{i:03}.rs"), b"");
        }

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let found = resolver.search("match").await;
        assert_eq!(found.len(), MAX_SEARCH_RESULTS);
    }

    #[tokio::test]
    async fn test_configured_max_results_cannot_exceed_cap() {
        let dir = TempDir::new().unwrap();
        for i in 0..100 {
            touch(dir.path(), &format!("match_{i:03}.rs"), b"");
        }
        let roots = vec![dir.path().to_path_buf()];

        let config = SearchConfig {
            max_results: 100,
            ..Default::default()
        };
        let resolver = WorkspaceFileResolver::from_config(roots.clone(), &config);
        assert_eq!(resolver.search("match").await.len(), MAX_SEARCH_RESULTS);

        let config = SearchConfig {
            max_results: 5,
            ..Default::default()
        };
        let resolver = WorkspaceFileResolver::from_config(roots, &config);
        assert_eq!(resolver.search("match").await.len(), 5);
    }

    #[tokio::test]
    async fn test_search_skips_ignored_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "node_modules/lib/index.js", b"");
        touch(dir.path(), ".git/index", b"");
        touch(dir.path(), "src/index.ts", b"");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let found = resolver.search("index").await;
        assert_eq!(names(&found), vec!["index.ts"]);
    }

    #[tokio::test]
    async fn test_search_treats_glob_chars_literally() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a[1].txt", b"");
        touch(dir.path(), "a1.txt", b"");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        assert_eq!(names(&resolver.search("[1]").await), vec!["a[1].txt"]);
    }

    #[tokio::test]
    async fn test_search_multi_root_prefixes_root_name() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(second.path(), "lib/util.ts", b"");

        let resolver = WorkspaceFileResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let found = resolver.search("util").await;

        let label = second.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].relative_path, format!("{label}/lib/util.ts"));
    }

    #[tokio::test]
    async fn test_search_missing_root_is_empty() {
        let resolver = WorkspaceFileResolver::new(vec![PathBuf::from("/definitely/not/here")]);
        assert!(resolver.search("x").await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_text_file_returns_content() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "README", b"# Project\n");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let content = resolver.resolve(&path.to_string_lossy()).await.unwrap();

        assert_eq!(content.file_type, FileType::Text);
        assert_eq!(content.content, "# Project\n");
    }

    #[tokio::test]
    async fn test_resolve_image_and_binary_placeholders() {
        let dir = TempDir::new().unwrap();
        let png = touch(dir.path(), "a.png", &[0x89, 0x50, 0x4e, 0x47]);
        let bin = touch(dir.path(), "a.bin", &[0, 159, 146, 150]);

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);

        let image = resolver.resolve(&png.to_string_lossy()).await.unwrap();
        assert_eq!(image.file_type, FileType::Image);
        assert!(image.content.contains("Image file: a.png"));
        assert!(image.content.contains("Size: 4 bytes"));

        let binary = resolver.resolve(&bin.to_string_lossy()).await.unwrap();
        assert_eq!(binary.file_type, FileType::Binary);
        assert!(binary.content.starts_with("Binary file: a.bin"));
    }

    #[tokio::test]
    async fn test_resolve_relative_path_uses_first_root() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/util.ts", b"export const x=1;");

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let content = resolver.resolve("src/util.ts").await.unwrap();
        assert_eq!(content.content, "export const x=1;");
    }

    #[tokio::test]
    async fn test_resolve_missing_or_directory_is_none() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        assert!(resolver.resolve("/no/such/file.ts").await.is_none());
        assert!(
            resolver
                .resolve(&dir.path().join("src").to_string_lossy())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_resolve_invalid_utf8_is_lossy() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "notes.txt", &[b'h', b'i', 0xff]);

        let resolver = WorkspaceFileResolver::new(vec![dir.path().to_path_buf()]);
        let content = resolver.resolve(&path.to_string_lossy()).await.unwrap();
        assert!(content.content.starts_with("hi"));
        assert_eq!(content.file_type, FileType::Text);
    }
}
