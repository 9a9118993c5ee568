use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::error::TlError;

lazy_static! {
    static ref LINE_DOC_RX:  Regex = Regex::new(r"^\s*///").unwrap();
    static ref BLOCK_DOC_RX: Regex = Regex::new(r"^\s*/\*\*(.*)").unwrap();
}

/// Contents of `path`, or an empty string if the file does not exist yet.
pub fn get_file_contents(path: &Path) -> Result<String, TlError> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write `contents` to `path` unless the file already holds them.
///
/// With `ignore_documentation`, doc comments in the old file are not taken
/// into account, so a file generated with documentation is not rewritten by a
/// run without it. Returns true if the file was written.
pub fn put_file_contents(path: &Path, contents: &str, ignore_documentation: bool) -> Result<bool, TlError> {
    let mut old_contents = get_file_contents(path)?;
    if ignore_documentation {
        old_contents = remove_documentation(&old_contents);
    }
    if old_contents == contents {
        return Ok(false);
    }

    info!("Write tl to file {}", path.display());
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(true)
}

/// Drop `///` lines and `/** ... */` blocks that start a line.
pub fn remove_documentation(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut inside_block = false;
    for line in text.split_inclusive('\n') {
        if inside_block {
            inside_block = !line.contains("*/");
            continue;
        }
        if LINE_DOC_RX.is_match(line) {
            continue;
        }
        if let Some(caps) = BLOCK_DOC_RX.captures(line) {
            inside_block = !caps[1].contains("*/");
            continue;
        }
        result.push_str(line);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_documentation() {
        let text = "/// Doc line.\npub struct A {\n    /** Block\n     * more\n     */\n    pub x: i32,\n    /** one line */\n}\n";
        assert_eq!(remove_documentation(text), "pub struct A {\n    pub x: i32,\n}\n");
        assert_eq!(remove_documentation("let x = 1; // not a doc\n"), "let x = 1; // not a doc\n");
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_file_contents(&dir.path().join("missing.rs")).unwrap(), "");
    }

    #[test]
    fn test_put_only_when_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("tl.rs");

        assert!(put_file_contents(&path, "pub struct A;\n", false).unwrap());
        assert!(!put_file_contents(&path, "pub struct A;\n", false).unwrap());
        assert!(put_file_contents(&path, "pub struct B;\n", false).unwrap());
        assert_eq!(get_file_contents(&path).unwrap(), "pub struct B;\n");
    }

    #[test]
    fn test_put_ignoring_documentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tl.rs");
        fs::write(&path, "/// B.\npub struct B;\n").unwrap();

        assert!(!put_file_contents(&path, "pub struct B;\n", true).unwrap());
        assert_eq!(get_file_contents(&path).unwrap(), "/// B.\npub struct B;\n");
        assert!(put_file_contents(&path, "pub struct B;\n", false).unwrap());
    }
}
