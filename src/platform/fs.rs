// LogFold - platform/fs.rs
//
// File reading helpers for the CLI host. Log files are not guaranteed to be
// valid UTF-8, so reads are lossy.

use std::io::{self, BufRead};
use std::path::Path;

/// Read the first `max_lines` lines of a file for profile detection.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_first_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut reader = io::BufReader::new(file);

    let mut lines = Vec::with_capacity(max_lines);
    let mut buf = Vec::new();
    while lines.len() < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        lines.push(text.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(lines)
}

/// Read the full content of a file as a string.
///
/// For files with invalid UTF-8, uses lossy conversion.
pub fn read_file_lossy(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_first_lines_stops_early_and_strips_terminators() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"one\r\ntwo\nthree\n").unwrap();
        let lines = read_first_lines(file.path(), 2).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_lossy_read_replaces_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ok \xff bad\n").unwrap();
        let text = read_file_lossy(file.path()).unwrap();
        assert!(text.starts_with("ok "));
        assert!(text.contains('\u{FFFD}'));
        let lines = read_first_lines(file.path(), 10).unwrap();
        assert_eq!(lines.len(), 1);
    }
}
