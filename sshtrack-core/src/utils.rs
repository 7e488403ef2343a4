use std::path::Path;

pub fn as_posix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn trim_separators(s: &str) -> &str {
    s.trim_end_matches(['/', '\\'])
}

/// Part of `local` after `root`, if `root` is a leading prefix that ends on a
/// component boundary.
fn strip_root<'a>(local: &'a str, root: &str) -> Option<&'a str> {
    let root = trim_separators(root);
    local
        .strip_prefix(root)
        .filter(|rest| rest.is_empty() || rest.starts_with(['/', '\\']) || root.is_empty())
}

/// Whether `local_path` lies at or below `local_root`, compared textually.
pub fn is_under_root(local_path: &Path, local_root: &Path) -> bool {
    strip_root(&local_path.to_string_lossy(), &local_root.to_string_lossy()).is_some()
}

/// Translate a local path under `local_root` into the mirrored remote path.
///
/// The local root is substituted once, as a leading prefix that ends on a
/// path component boundary. A path outside the root is returned unchanged;
/// check [`is_under_root`] first. Trailing separators on either root are
/// ignored.
pub fn map_path(local_path: &Path, local_root: &Path, remote_root: &str) -> String {
    let local = local_path.to_string_lossy();
    let Some(suffix) = strip_root(&local, &local_root.to_string_lossy()) else {
        return as_posix_path(local_path);
    };

    let mut out = String::with_capacity(remote_root.len() + suffix.len());
    out.push_str(trim_separators(remote_root));
    let suffix = suffix.replace('\\', "/");
    let suffix = trim_separators(&suffix);
    if !suffix.is_empty() && !suffix.starts_with('/') {
        out.push('/');
    }
    out.push_str(suffix);
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Parent directory of a remote path, or `None` at the root.
pub fn remote_parent(remote_path: &str) -> Option<&str> {
    match remote_path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => None,
        Some((parent, _)) => Some(parent),
    }
}
