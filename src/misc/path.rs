use std::borrow::Cow;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Replace `\` separators with `/`
pub fn to_posix(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Resolve `.` and `..` components without touching the filesystem, and use `/` separators.
///
/// `..` past the root of an absolute path is dropped; past the start of a relative path it is
/// kept.
pub fn normalize_path(path: &Utf8Path) -> Utf8PathBuf {
    let posix = to_posix(path.as_str());
    let mut components: Vec<Utf8Component<'_>> = Vec::new();
    for component in Utf8Path::new(&*posix).components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match components.last() {
                Some(Utf8Component::Normal(_)) => {
                    components.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }
    let mut normalized = Utf8PathBuf::new();
    for component in components {
        normalized.push(component.as_str());
    }
    normalized
}

/// `/`-separated path from the directory `base` to `path`, both normalized relative paths
pub fn relative_to(path: &str, base: &str) -> String {
    let path_segments = path.split('/').filter(|segment| !segment.is_empty()).collect::<Vec<_>>();
    let base_segments = base.split('/').filter(|segment| !segment.is_empty()).collect::<Vec<_>>();
    let common = path_segments.iter()
        .zip(&base_segments)
        .take_while(|(lhs, rhs)| lhs == rhs)
        .count();
    let mut segments = vec![".."; base_segments.len() - common];
    segments.extend(&path_segments[common..]);
    segments.join("/")
}
