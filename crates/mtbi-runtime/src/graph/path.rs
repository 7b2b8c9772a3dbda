//! Lexical path normalization.

use std::path::{Component, Path, PathBuf};

/// Resolves `path` against `base` and removes `.` and `..` components
/// without touching the filesystem.
///
/// Two declarations of the same file (`./out/x.pickle`, `out/../out/x.pickle`)
/// normalize to the same key, so output-to-input matching does not depend on
/// how a path was spelled.
pub(crate) fn resolve(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}
