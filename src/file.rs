//! A named filesystem object with a queryable modification time — the leaf
//! of the Target-is-a-File hierarchy (§3, §9).

use std::fs;
use std::time::UNIX_EPOCH;

use log::error;

/// A plain file reference: a path and nothing else. `Target` embeds one of
/// these (by name) so that the freshness check can treat "a target" and
/// "a bare prerequisite path" uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct File {
    pub name: String,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        File { name: name.into() }
    }

    /// Modification time in seconds since the epoch, or `0` if the file
    /// does not exist. Any other stat failure is logged and also treated
    /// as `0` so the build conservatively proceeds (§7.4).
    pub fn time(&self) -> u64 {
        time_of(&self.name)
    }

    /// Unlinks the file. In verbose mode the removal is announced; any
    /// failure is reported and signalled back to the caller.
    pub fn remove(&self, verbose: bool) -> std::io::Result<()> {
        let res = fs::remove_file(&self.name);
        match &res {
            Ok(()) => {
                if verbose {
                    println!("removed {}", self.name);
                }
            }
            Err(e) => {
                eprintln!("unlink {}: {}", self.name, e);
            }
        }
        res
    }
}

/// Shared by `File` and `Target` (which also carries a `name`): stat the
/// path and reduce to the 0-or-mtime convention described in §4.1.
pub fn time_of(name: &str) -> u64 {
    match fs::metadata(name) {
        Ok(meta) => match meta.modified() {
            Ok(t) => t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
            Err(e) => {
                error!("file {}: cannot read modification time: {}", name, e);
                0
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => {
            error!("file {}: stat failed: {}", name, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_has_time_zero() {
        assert_eq!(time_of("/no/such/path/ever"), 0);
    }

    #[test]
    fn existing_file_has_nonzero_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "hi").unwrap();
        assert!(File::new(path.to_string_lossy().into_owned()).time() > 0);
    }

    #[test]
    fn remove_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::File::create(&path).unwrap();
        let f = File::new(path.to_string_lossy().into_owned());
        assert!(f.remove(false).is_ok());
        assert!(!path.exists());
    }
}
