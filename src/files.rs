//! Whole-file writes and line edits used for the marker, cache and shell files.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Writes `data` to `path` in one go, readable and writable by the owner only.
pub fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    write_with_mode(path, data, 0o600)
}

/// Writes `data` to `path`, truncating it, with the given unix permissions.
pub fn write_with_mode(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(mode);
        let mut file = options.open(path)?;
        // mode() only applies on creation
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        file.write_all(data)
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        options.open(path)?.write_all(data)
    }
}

/// Appends `text` to an existing file.
pub fn append(path: &Path, text: &str) -> io::Result<()> {
    fs::OpenOptions::new()
        .append(true)
        .open(path)?
        .write_all(text.as_bytes())
}

/// Rewrites `path` without the lines starting with `prefix`.
///
/// Returns the removed lines. Every kept line is terminated by `\n`.
pub fn remove_lines_starting_with(path: &Path, prefix: &str) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let (removed, kept): (Vec<&str>, Vec<&str>) =
        contents.lines().partition(|line| line.starts_with(prefix));

    let mut out = String::with_capacity(contents.len());
    for line in kept {
        out.push_str(line);
        out.push('\n');
    }
    fs::write(path, out)?;

    Ok(removed.into_iter().map(str::to_owned).collect())
}
