//! Path-based file classification.
//!
//! Classification looks only at the file name, never at the bytes, so it can
//! run before anything is read.

use std::path::Path;

use super::model::FileType;

/// Extensions whose content is sent verbatim.
const TEXT_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "py", "java", "c", "cpp", "h", "hpp", "cs", "php", "rb", "go", "rs",
    "swift", "kt", "scala", "clj", "hs", "ml", "fs", "vb", "pl", "r", "m", "sh", "bash", "zsh",
    "fish", "ps1", "bat", "cmd", "html", "htm", "xml", "css", "scss", "sass", "less", "json",
    "yaml", "yml", "toml", "ini", "cfg", "conf", "config", "env", "gitignore", "gitattributes",
    "md", "markdown", "rst", "txt", "log", "sql", "graphql", "gql", "dockerfile", "makefile",
    "cmake", "gradle", "pom", "lock",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tiff", "tif", "psd", "ai", "eps",
];

/// Conventional names that are text even without a known extension.
const TEXT_FILE_NAMES: &[&str] = &[
    "readme",
    "license",
    "changelog",
    "authors",
    "contributors",
    "dockerfile",
    "makefile",
    "gemfile",
    "rakefile",
    "procfile",
];

/// Classifies a path as text, image or binary.
pub fn classify_path(path: &Path) -> FileType {
    let extension = normalized_extension(path);

    if let Some(ext) = extension.as_deref() {
        if TEXT_EXTENSIONS.contains(&ext) {
            return FileType::Text;
        }
    }
    if is_conventional_text_name(path) {
        return FileType::Text;
    }
    match extension.as_deref() {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => FileType::Image,
        _ => FileType::Binary,
    }
}

/// Lowercased extension. A dotfile like `.gitignore` is its own extension.
fn normalized_extension(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if let Some(rest) = file_name.strip_prefix('.') {
        if !rest.is_empty() && !rest.contains('.') {
            return Some(rest.to_lowercase());
        }
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

fn is_conventional_text_name(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let file_name = file_name.to_lowercase();
    TEXT_FILE_NAMES.iter().any(|name| {
        file_name == *name
            || file_name
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Placeholder sent instead of an image's bytes.
pub fn image_placeholder(path: &Path, size: u64) -> String {
    format!(
        "Image file: {}\nSize: {} bytes\nPath: {}",
        display_name(path),
        size,
        path.display()
    )
}

/// Placeholder sent instead of a binary file's bytes.
pub fn binary_placeholder(path: &Path, size: u64) -> String {
    format!(
        "Binary file: {}\nSize: {} bytes\nPath: {}",
        display_name(path),
        size,
        path.display()
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
