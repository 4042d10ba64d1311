//! Pure string-level path helpers for project-relative paths.
//!
//! Project files always spell paths with forward slashes once normalized, no
//! matter what the generator emitted, so duplicate detection and hint-path
//! rewriting can compare strings directly. These helpers never touch the
//! filesystem; `std::path` is only used where real I/O happens.

/// Separator every stored path uses after normalization.
pub const CANONICAL_SEPARATOR: char = '/';

/// Separator the generator may emit on Windows.
pub const NON_CANONICAL_SEPARATOR: char = '\\';

/// Replace every backslash with the canonical separator.
///
/// Paths that already use the canonical form come back unchanged.
pub fn normalize_separators(path: &str) -> String {
    if path.contains(NON_CANONICAL_SEPARATOR) {
        path.replace(NON_CANONICAL_SEPARATOR, "/")
    } else {
        path.to_string()
    }
}

/// Strip a single trailing separator of either kind, if present.
pub fn remove_trailing_separator(path: &str) -> &str {
    path.strip_suffix(['/', '\\']).unwrap_or(path)
}

/// Directory portion of `path`, without the trailing separator.
///
/// Empty when the path has no directory component, or when the only
/// separator is the leading one (`/foo.bar` has no usable directory).
pub fn directory_name(path: &str) -> String {
    let normalized = normalize_separators(path);

    match normalized.rfind(CANONICAL_SEPARATOR) {
        Some(position) if position >= 1 => normalized[..position].to_string(),
        _ => String::new(),
    }
}

/// Final path segment; empty for paths ending in a separator.
pub fn file_name(path: &str) -> String {
    let normalized = normalize_separators(path);
    let name_length = file_name_length(&normalized);

    normalized[normalized.len() - name_length..].to_string()
}

/// Final path segment with its extension removed.
///
/// The extension starts at the last `.` inside the name span only. A name
/// that is all extension (`.foo`, `.`) yields an empty base name; a name
/// ending in `.` keeps everything before the dot.
pub fn file_name_without_extension(path: &str) -> String {
    let normalized = normalize_separators(path);
    let name_length = file_name_length(&normalized);

    if name_length == 0 {
        return String::new();
    }

    let name = &normalized[normalized.len() - name_length..];

    match name.rfind('.') {
        None => name.to_string(),
        Some(dot_position) => name[..dot_position].to_string(),
    }
}

/// Join two paths with exactly one canonical separator.
///
/// Both sides are normalized and stripped of leading/trailing separators
/// first; an empty side yields the other side unchanged.
pub fn combine(path1: &str, path2: &str) -> String {
    let normalized1 = normalize_separators(path1);
    let normalized2 = normalize_separators(path2);

    let trimmed1 = normalized1.trim_matches(CANONICAL_SEPARATOR);
    let trimmed2 = normalized2.trim_matches(CANONICAL_SEPARATOR);

    if trimmed1.is_empty() {
        return trimmed2.to_string();
    }

    if trimmed2.is_empty() {
        return trimmed1.to_string();
    }

    format!("{trimmed1}{CANONICAL_SEPARATOR}{trimmed2}")
}

/// Length of the name span after the last separator (the whole string when
/// there is no separator).
fn file_name_length(normalized: &str) -> usize {
    match normalized.rfind(CANONICAL_SEPARATOR) {
        None => normalized.len(),
        Some(position) => normalized.len() - position - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_separators_maps_both_kinds_to_canonical() {
        assert_eq!(normalize_separators(""), "");
        assert_eq!(normalize_separators("/"), "/");
        assert_eq!(normalize_separators("\\"), "/");
        assert_eq!(normalize_separators("/foo/"), "/foo/");
        assert_eq!(normalize_separators("/foo\\"), "/foo/");
        assert_eq!(normalize_separators("\\foo/"), "/foo/");
        assert_eq!(normalize_separators("\\foo\\"), "/foo/");
        assert_eq!(normalize_separators("foo.bar"), "foo.bar");
        assert_eq!(normalize_separators("foo/bar.baz"), "foo/bar.baz");
        assert_eq!(normalize_separators("foo\\bar.baz"), "foo/bar.baz");
    }

    #[test]
    fn normalize_separators_is_idempotent() {
        for input in ["", "/", "\\", "a\\b/c\\d", "foo\\bar\\baz.cs"] {
            let once = normalize_separators(input);
            assert_eq!(normalize_separators(&once), once);
        }
    }

    #[test]
    fn remove_trailing_separator_strips_one_of_either_kind() {
        assert_eq!(remove_trailing_separator("foo/"), "foo");
        assert_eq!(remove_trailing_separator("foo\\"), "foo");
        assert_eq!(remove_trailing_separator("foo"), "foo");
        assert_eq!(remove_trailing_separator("foo//"), "foo/");
        assert_eq!(remove_trailing_separator(""), "");
    }

    #[test]
    fn directory_name_excludes_trailing_separator() {
        assert_eq!(directory_name(""), "");
        assert_eq!(directory_name("/"), "");
        assert_eq!(directory_name("\\"), "");
        assert_eq!(directory_name("/foo/"), "/foo");
        assert_eq!(directory_name("\\foo\\"), "/foo");
        assert_eq!(directory_name("foo.bar"), "");
        assert_eq!(directory_name("/foo.bar"), "");
        assert_eq!(directory_name("foo/bar.baz"), "foo");
        assert_eq!(directory_name("foo\\bar\\baz"), "foo/bar");
        assert_eq!(directory_name("foo/bar/baz"), "foo/bar");
    }

    #[test]
    fn combine_joins_with_single_separator() {
        assert_eq!(combine("", ""), "");
        assert_eq!(combine("/", ""), "");
        assert_eq!(combine("", "\\"), "");
        assert_eq!(combine("/foo/", ""), "foo");
        assert_eq!(combine("", "/foo/"), "foo");
        assert_eq!(combine("foo", "/"), "foo");
        assert_eq!(combine("/", "foo"), "foo");
        assert_eq!(combine("foo", "bar"), "foo/bar");
        assert_eq!(combine("foo", "bar/baz"), "foo/bar/baz");
        assert_eq!(combine("foo/bar", "baz"), "foo/bar/baz");
        assert_eq!(combine("foo\\bar", "baz\\qux"), "foo/bar/baz/qux");
    }

    #[test]
    fn file_name_is_empty_after_trailing_separator() {
        assert_eq!(file_name(""), "");
        assert_eq!(file_name("/"), "");
        assert_eq!(file_name("/foo/"), "");
        assert_eq!(file_name("\\foo\\"), "");
        assert_eq!(file_name("foo"), "foo");
        assert_eq!(file_name("/foo"), "foo");
        assert_eq!(file_name("foo.bar"), "foo.bar");
        assert_eq!(file_name("foo/bar.baz"), "bar.baz");
        assert_eq!(file_name("foo/bar/baz"), "baz");
    }

    #[test]
    fn file_name_without_extension_splits_on_last_dot() {
        assert_eq!(file_name_without_extension(""), "");
        assert_eq!(file_name_without_extension("/"), "");
        assert_eq!(file_name_without_extension("/foo/"), "");
        assert_eq!(file_name_without_extension("foo"), "foo");
        assert_eq!(file_name_without_extension("/foo"), "foo");
        assert_eq!(file_name_without_extension("foo.bar"), "foo");
        assert_eq!(file_name_without_extension("foo.bar.baz"), "foo.bar");
        assert_eq!(file_name_without_extension("foo/bar.baz"), "bar");
        assert_eq!(file_name_without_extension("foo/bar/baz"), "baz");
    }

    #[test]
    fn dotfiles_have_no_base_name() {
        assert_eq!(file_name_without_extension("."), "");
        assert_eq!(file_name_without_extension("/."), "");
        assert_eq!(file_name_without_extension(".foo"), "");
        assert_eq!(file_name_without_extension("/.foo"), "");
        assert_eq!(file_name_without_extension("foo."), "foo");
        assert_eq!(file_name_without_extension("/foo."), "foo");
        assert_eq!(file_name_without_extension("./foo."), "foo");
    }

    #[test]
    fn decomposition_round_trips_through_combine() {
        let original = normalize_separators("foo\\bar/baz.cs");
        let directory = directory_name(&original);
        let name = file_name(&original);

        assert_eq!(combine(&directory, &name), original);
        assert_eq!(
            format!("{}.cs", file_name_without_extension(&original)),
            name
        );
    }
}
