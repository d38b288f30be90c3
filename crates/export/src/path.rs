//! Path-hint resolution for exports.
//!
//! Accepts anything a user might type after `--export` and always
//! produces a usable file path. The rules, applied in order:
//!
//! 1. empty hint → `<stem>.<default_ext>` in the current directory
//! 2. a bare extension token (`csv`, `.json`) → `<stem>.<ext>`
//! 3. `.` and `~` expand to cwd / home, then
//! 4. an existing directory, or any hint with a trailing separator,
//!    gets `<stem>.<default_ext>` appended
//! 5. a hint without an extension gains `.<default_ext>`
//! 6. everything else is taken verbatim
//!
//! A dotfile name like `.hidden` is a filename, not an extension token;
//! only an exact supported-extension string selects a default name.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_STEM: &str = "cbsanalyzer";

/// Extensions recognized as extension tokens and by the serializer.
pub(crate) const EXPORT_EXTENSIONS: [&str; 5] = ["csv", "xlsx", "xls", "json", "parquet"];

/// Total over any input string; never fails.
pub fn resolve_export_path(hint: &str, default_stem: &str, default_ext: &str) -> PathBuf {
    let hint = hint.trim();
    if hint.is_empty() {
        return PathBuf::from(format!("{default_stem}.{default_ext}"));
    }
    if let Some(ext) = extension_token(hint) {
        return PathBuf::from(format!("{default_stem}.{ext}"));
    }

    let expanded = expand(hint);
    // A trailing separator is an explicit directory hint even when the
    // directory does not exist yet.
    if expanded.is_dir() || hint.ends_with(['/', '\\']) {
        return expanded.join(format!("{default_stem}.{default_ext}"));
    }

    // `Path::extension` treats `.hidden` as extensionless, so dotfiles
    // get the default extension appended rather than misread.
    match expanded.extension() {
        Some(_) => expanded,
        None => {
            let mut os = expanded.into_os_string();
            os.push(format!(".{default_ext}"));
            PathBuf::from(os)
        }
    }
}

/// `csv` or `.csv` selects the default stem with that extension; any
/// other leading-dot string is a literal dotfile name.
fn extension_token(hint: &str) -> Option<&str> {
    let token = hint.strip_prefix('.').unwrap_or(hint);
    EXPORT_EXTENSIONS
        .iter()
        .find(|&&ext| token.eq_ignore_ascii_case(ext))
        .copied()
}

fn expand(hint: &str) -> PathBuf {
    if hint == "." {
        return env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }
    if hint == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = hint.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(hint)
}

fn home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(hint: &str) -> PathBuf {
        resolve_export_path(hint, DEFAULT_STEM, "csv")
    }

    #[test]
    fn empty_hint_uses_default_name() {
        assert_eq!(resolve(""), PathBuf::from("cbsanalyzer.csv"));
        assert_eq!(resolve("   "), PathBuf::from("cbsanalyzer.csv"));
    }

    #[test]
    fn extension_token_selects_default_stem() {
        assert_eq!(resolve("csv"), PathBuf::from("cbsanalyzer.csv"));
        assert_eq!(resolve(".csv"), PathBuf::from("cbsanalyzer.csv"));
        assert_eq!(resolve("JSON"), PathBuf::from("cbsanalyzer.json"));
        assert_eq!(resolve(".parquet"), PathBuf::from("cbsanalyzer.parquet"));
    }

    #[test]
    fn trailing_separator_is_a_directory_hint() {
        assert_eq!(
            resolve("path/to/dir/"),
            PathBuf::from("path/to/dir/cbsanalyzer.csv")
        );
    }

    #[test]
    fn existing_directory_gets_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let hint = dir.path().to_str().unwrap();
        assert_eq!(resolve(hint), dir.path().join("cbsanalyzer.csv"));
    }

    #[test]
    fn bare_name_gains_default_extension() {
        assert_eq!(resolve("file"), PathBuf::from("file.csv"));
        assert_eq!(resolve("out/report"), PathBuf::from("out/report.csv"));
    }

    #[test]
    fn full_filename_passes_through() {
        assert_eq!(resolve("file.csv"), PathBuf::from("file.csv"));
        assert_eq!(resolve("out/report.json"), PathBuf::from("out/report.json"));
    }

    #[test]
    fn dotfile_is_not_an_extension_token() {
        assert_eq!(resolve("/dir/.hidden.csv"), PathBuf::from("/dir/.hidden.csv"));
        assert_eq!(resolve(".hidden"), PathBuf::from(".hidden.csv"));
    }

    #[test]
    fn dot_expands_to_current_directory() {
        let resolved = resolve(".");
        assert!(resolved.ends_with("cbsanalyzer.csv"));
        assert_ne!(resolved, PathBuf::from("cbsanalyzer.csv"));
    }

    #[test]
    fn unknown_extension_still_resolves() {
        // Resolution is total; format validation happens in the writer.
        assert_eq!(resolve("report.pdf"), PathBuf::from("report.pdf"));
    }
}
