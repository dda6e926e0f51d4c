//! Crate-wide constants.

/// Source-file extension a bare `import "name"` resolves against, relative
/// to the importing file's directory.
pub const MODULE_EXTENSION: &str = "willow";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
