use std::path::{Component, Path, PathBuf};

/// Lexically normalize `path`: drop `.` components and fold `..` into the
/// preceding component. Leading `..` on a relative path are kept. The filesystem is never consulted, so the result is
/// stable for files that do not exist (yet).
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = Vec::new();
    for c in path.components() {
        match c {
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // A relative path keeps the `..` it cannot fold.
                None | Some(Component::ParentDir) => out.push(c),
                // Never pop past the root or a drive prefix.
                Some(_) => {}
            },
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out.iter().collect()
}
