//! Scaffolder (§4.8): materializes the shell helper script at a fixed temp
//! path, and writes a starter buildfile for `-c STMT`. Neither touches the
//! dependency graph — they exist purely to make the binary self-bootstrapping.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const HELPER_SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/helper.sh"));
const STARTER_BUILDFILE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/starter_buildfile.sh"));

/// Fixed temp path the helper script lives at, mirroring the original
/// tool's `/tmp/shmake.sh`.
pub fn helper_path() -> PathBuf {
    PathBuf::from("/tmp/shmake.sh")
}

/// Writes the helper script to its well-known path if it isn't already
/// there (§4.8 "Helper materializer").
pub fn ensure_helper() -> Result<PathBuf> {
    let path = helper_path();
    if !path.exists() {
        fs::write(&path, HELPER_SCRIPT).map_err(|e| Error::CannotCreate(path.clone(), e))?;
    }
    Ok(path)
}

/// Writes a starter `./buildfile` whose body is `stmt`, sources the helper
/// script, and marks it executable (§4.8 "`-c STMT` scaffolder").
pub fn scaffold_buildfile(stmt: &str) -> Result<()> {
    let helper = ensure_helper()?;
    let contents = STARTER_BUILDFILE
        .replace("{{HELPER_PATH}}", &helper.to_string_lossy())
        .replace("{{STMT}}", stmt);

    let path = Path::new("buildfile");
    fs::write(path, contents).map_err(|e| Error::CannotCreate(path.to_path_buf(), e))?;

    let mut perms = fs::metadata(path).map_err(|e| Error::CannotRead(path.to_path_buf(), e))?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).map_err(|e| Error::CannotCreate(path.to_path_buf(), e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_buildfile_is_executable_and_contains_stmt() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        scaffold_buildfile("C hello hello.c").unwrap();
        let contents = fs::read_to_string("buildfile").unwrap();
        let mode = fs::metadata("buildfile").unwrap().permissions().mode();

        std::env::set_current_dir(prev).unwrap();

        assert!(contents.contains("C hello hello.c"));
        assert_ne!(mode & 0o111, 0);
    }
}
