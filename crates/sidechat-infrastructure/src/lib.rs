pub mod file_resolver;
pub mod paths;
pub mod settings_service;
pub mod storage;

pub use crate::file_resolver::WorkspaceFileResolver;
pub use crate::paths::SidechatPaths;
pub use crate::settings_service::SettingsService;
