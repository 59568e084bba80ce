//! Template path resolution.
//!
//! Every path used as a cache key or handed to a loader goes through [`resolve`], so keys
//! are `/`-separated, free of `.` and `..` segments and relative to the base directory.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_PARENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:\.{1,2}(?:/|$))+").unwrap());

/// Collapses `.` and `..` segments and repeated separators.
///
/// A leading `/` is kept. `..` segments that climb above the start of a relative path
/// are kept; above the root of an absolute path they are dropped.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => (),
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => (),
                _ => segments.push(".."),
            },
            segment => segments.push(segment),
        }
    }
    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

fn dirname(file: &str) -> &str {
    match file.rfind('/') {
        Some(pos) => &file[..pos],
        None => "",
    }
}

/// Resolves `reference` as seen from `including`.
///
/// References starting with `/` are relative to the base directory. Anything else is
/// relative to the directory of `including`; leading `./` and `../` segments left after
/// normalization are stripped so the result never escapes the base directory. The root
/// template of a compile is resolved with an empty `including`.
pub fn resolve(including: &str, reference: &str) -> String {
    let reference = normalize(reference);
    if reference.starts_with('/') {
        return reference.trim_start_matches('/').to_string();
    }
    let joined = match dirname(including) {
        "" => reference,
        dir => normalize(&format!("{dir}/{reference}")),
    };
    LEADING_PARENTS.replace(joined.trim_start_matches('/'), "").into_owned()
}
