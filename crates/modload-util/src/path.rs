use std::path::{Component, Path, PathBuf};

/// Join a request path (e.g. `/static/app.ts`) onto a root directory.
///
/// Empty and `.` segments are dropped. Returns `None` if any segment would
/// escape the root (`..`, absolute components, drive prefixes).
#[must_use]
pub fn join_under_root(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();

    for segment in request_path.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }

        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => joined.push(part),
            _ => return None,
        }
    }

    Some(joined)
}

/// Strip a leading `/` (or several) from a request path.
#[must_use]
pub fn trim_leading_slashes(request_path: &str) -> &str {
    request_path.trim_start_matches('/')
}
