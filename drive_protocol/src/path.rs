//! Absolute POSIX-style path utilities.
//!
//! Pure, I/O-free — no filesystem access; data-shape helpers stay free of
//! side effects.

/// Returns true if `p` starts with `/`.
pub fn is_absolute(p: &str) -> bool {
    p.starts_with('/')
}

fn components(p: &str) -> Vec<&str> {
    p.split('/').filter(|c| !c.is_empty()).collect()
}

/// Normalises an absolute path: collapses `//`, resolves `.`/`..` textually,
/// strips any trailing slash (except for the root `/`).
///
/// Non-absolute input is returned unchanged — callers validate
/// [`is_absolute`] first and raise `InvalidArgument` themselves; this
/// function is total so it can be used in property tests without a `Result`.
pub fn normalize(p: &str) -> String {
    if !is_absolute(p) {
        return p.to_string();
    }

    let mut stack: Vec<&str> = Vec::new();
    for part in components(p) {
        match part {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Returns the parent path of `p`. `dirname("/a/b") == "/a"`,
/// `dirname("/a") == "/"`, `dirname("/") == "/"`.
pub fn dirname(p: &str) -> String {
    let normalized = normalize(p);
    let comps = components(&normalized);
    if comps.len() <= 1 {
        "/".to_string()
    } else {
        format!("/{}", comps[..comps.len() - 1].join("/"))
    }
}

/// Returns the final path component of `p`. `basename("/") == ""`.
pub fn basename(p: &str) -> String {
    let normalized = normalize(p);
    components(&normalized)
        .last()
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Joins an absolute base path `a` with a relative (or absolute) segment `b`
/// and normalises the result.
pub fn join(a: &str, b: &str) -> String {
    if is_absolute(b) {
        return normalize(b);
    }
    let glued = if a.ends_with('/') {
        format!("{a}{b}")
    } else {
        format!("{a}/{b}")
    };
    normalize(&glued)
}

/// True iff `parent` is a proper ancestor of `child` under component-wise
/// comparison — `is_within("/a", "/ab")` is false even though `"/ab"` has
/// `"/a"` as a string prefix.
pub fn is_within(parent: &str, child: &str) -> bool {
    let parent = normalize(parent);
    let child = normalize(child);
    if parent == child {
        return false;
    }
    let parent_comps = components(&parent);
    let child_comps = components(&child);
    if child_comps.len() <= parent_comps.len() {
        return false;
    }
    child_comps[..parent_comps.len()] == parent_comps[..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_idempotent() {
        let cases = ["/", "/a/b/", "/a/./b/../c", "//a//b", "/..", "/a/../../b"];
        for c in cases {
            let once = normalize(c);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {c:?}");
        }
    }

    #[test]
    fn normalize_basic() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/a/b/"), "/a/b");
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("//a//b"), "/a/b");
        assert_eq!(normalize("/.."), "/");
    }

    #[test]
    fn dirname_basename() {
        assert_eq!(dirname("/a/b"), "/a");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(basename("/a/b"), "b");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn join_relative_and_absolute() {
        assert_eq!(join("/a", "b"), "/a/b");
        assert_eq!(join("/a/", "b"), "/a/b");
        assert_eq!(join("/a", "/b"), "/b");
    }

    #[test]
    fn within_is_proper_ancestor_not_prefix() {
        assert!(is_within("/a", "/a/b"));
        assert!(!is_within("/a", "/ab"));
        assert!(!is_within("/a", "/a"));
        assert!(is_within("/", "/a"));
    }
}
