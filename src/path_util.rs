//! Small path-string helpers, generalized from the teacher's flat `utils.rs`
//! style of module (a handful of free functions, no state) and grounded in
//! `utils.c`'s `join`/`file_replace_extension` of the original tool.

use std::fs;
use std::path::{Path, PathBuf};

/// Joins an output directory and a file name the way the original `join()`
/// does: an empty `odir`, an absolute `f`, or an `f` starting with `./` all
/// pass `f` through unchanged. An absolute `odir` keeps only `f`'s basename.
/// Otherwise `odir` is created (mode 0777, modulo umask) if missing and the
/// two are joined.
pub fn join(odir: &str, f: &str) -> String {
    if odir.is_empty() || f.starts_with("./") || f.starts_with('/') {
        return f.to_string();
    }

    let name = if odir.starts_with('/') {
        Path::new(f)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| f.to_string())
    } else {
        f.to_string()
    };

    if !Path::new(odir).is_dir() {
        let _ = fs::create_dir_all(odir);
    }

    format!("{}/{}", odir, name)
}

/// Replaces (or appends) `path`'s extension with `ext`. `ext` may include or
/// omit the leading dot; an empty `ext` strips the extension entirely.
pub fn replace_extension(path: &str, ext: &str) -> String {
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    let p = PathBuf::from(path);
    if ext.is_empty() {
        p.with_extension("")
    } else {
        p.with_extension(ext)
    }
    .to_string_lossy()
    .into_owned()
}

/// Extension of `path`, with the leading dot, or `""` if there is none.
pub fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Splits a space-separated string into its components, returning an empty
/// `Vec` for blank input (the original `split()` instead returns `NULL`;
/// an empty `Vec` is the idiomatic equivalent here).
pub fn split(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

/// Appends `extra` to `s` with a single space, skipping blank `extra` —
/// the teacher-style `cat()` helper from `utils.c`.
pub fn cat(s: &mut String, extra: &str) {
    if extra.trim().is_empty() {
        return;
    }
    if s.trim().is_empty() {
        *s = extra.to_string();
    } else {
        s.push(' ');
        s.push_str(extra);
    }
}

/// `["A", "B"]`, `"-F"` -> `"-FA -FB"` (empty string if `items` is empty).
pub fn flag_concat(prefix: &str, items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_extension_is_idempotent_on_final_ext() {
        let once = replace_extension("foo.c", ".x");
        let twice = replace_extension(&once, ".y");
        assert_eq!(twice, replace_extension("foo.c", ".y"));
    }

    #[test]
    fn join_empty_odir_passes_through() {
        assert_eq!(join("", "foo.c"), "foo.c");
    }

    #[test]
    fn join_absolute_file_passes_through() {
        assert_eq!(join("out", "/abs/foo.c"), "/abs/foo.c");
    }

    #[test]
    fn join_dot_slash_file_passes_through() {
        assert_eq!(join("out", "./foo.c"), "./foo.c");
    }

    #[test]
    fn join_relative_joins_and_ends_with_basename() {
        let joined = join("build", "src/foo.c");
        assert!(joined.starts_with("build"));
        assert!(joined.ends_with("src/foo.c"));
    }

    #[test]
    fn join_absolute_odir_uses_only_basename() {
        let dir = tempfile::tempdir().unwrap();
        let odir = dir.path().to_string_lossy().into_owned();
        let joined = join(&odir, "src/foo.c");
        assert!(joined.starts_with(&odir));
        assert!(joined.ends_with("/foo.c"));
        assert!(!joined.contains("src/foo.c"));
    }

    #[test]
    fn flag_concat_joins_with_prefix() {
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(flag_concat("-D", &items), "-Da -Db");
    }

    #[test]
    fn cat_appends_with_space() {
        let mut s = String::from("-Wall");
        cat(&mut s, "-O2");
        assert_eq!(s, "-Wall -O2");
    }

    #[test]
    fn cat_skips_blank() {
        let mut s = String::from("-Wall");
        cat(&mut s, "  ");
        assert_eq!(s, "-Wall");
    }
}
