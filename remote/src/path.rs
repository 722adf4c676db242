//! Remote path helpers
//!
//! Remote paths are plain strings using '/' as the separator no matter what the local host uses.
//! Both POSIX roots (`/`) and drive roots (`C:/`) are understood so that the same helpers work
//! for POSIX and Windows hosts.

fn is_drive(component: &str) -> bool {
    let bytes = component.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Convert separators to '/', drop empty and `.` components and any trailing separator
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let parts: Vec<&str> = unified
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let mut normalized = parts.join("/");
    if unified.starts_with('/') {
        normalized.insert(0, '/');
    } else if parts.len() == 1 && is_drive(parts[0]) {
        normalized.push('/');
    }
    normalized
}

/// True for `/`, drive roots and the empty path, none of which can be created or cleared
pub fn is_root(path: &str) -> bool {
    let path = normalize(path);
    let bytes = path.as_bytes();
    path.is_empty()
        || path == "/"
        || (bytes.len() == 3 && bytes[2] == b'/' && path.get(..2).is_some_and(is_drive))
}

pub fn join(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        return normalize(root);
    }
    normalize(&format!("{root}/{relative}"))
}

/// Parent directory, `None` for roots and single relative components
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    if is_root(&path) {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) if is_drive(&path[..idx]) => Some(format!("{}/", &path[..idx])),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

pub fn file_name(path: &str) -> Option<String> {
    let path = normalize(path);
    if is_root(&path) {
        return None;
    }
    path.rsplit('/').next().map(str::to_string)
}
