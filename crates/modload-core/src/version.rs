use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("modload {VERSION}");

    if let Some(hash) = option_env!("MODLOAD_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
