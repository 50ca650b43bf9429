//! Needs resolver (§4.6): resolves a symbolic name to extra `cflags`/`lflags`
//! via a `.need` property file (cwd, then a configurable need-path, then
//! `$HOME/.shmake/`), falling back to `pkg-config`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::template::substitute;

#[derive(Debug, Default, Clone)]
pub struct Need {
    pub cflags: String,
    pub libs: String,
}

/// Parses `.need` file contents: one `key=value` pair per line, blank lines
/// and `#`-led comments ignored.
fn parse_need_file(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}

fn candidate_paths(name: &str, need_path: Option<&str>) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(format!("{}.need", name))];
    if let Some(np) = need_path {
        paths.push(Path::new(np).join(format!("{}.need", name)));
    }
    if let Ok(home) = std::env::var("HOME") {
        paths.push(Path::new(&home).join(".shmake").join(format!("{}.need", name)));
    }
    paths
}

/// Resolves a single need. `.need` files win over `pkg-config`; within the
/// file-based lookup, cwd wins over `need_path` wins over `$HOME/.shmake`.
pub fn resolve(name: &str, need_path: Option<&str>) -> Result<Need> {
    for path in candidate_paths(name, need_path) {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            debug!("need {}: resolved from {}", name, path.display());
            let mut vars = parse_need_file(&contents);
            let here = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .and_then(|p| p.canonicalize().ok())
                .unwrap_or_else(|| PathBuf::from("."));
            vars.insert("HERE".to_string(), here.to_string_lossy().into_owned());

            let vars_snapshot = vars.clone();
            let expand = |key: &str| -> String {
                vars_snapshot
                    .get(key)
                    .map(|v| substitute(v, "${", "}", &vars_snapshot))
                    .unwrap_or_default()
            };

            return Ok(Need { cflags: expand("cflags"), libs: expand("libs") });
        }
    }

    debug!("need {}: no .need file found, falling back to pkg-config", name);
    let cflags = pkg_config_query(name, "--cflags")?;
    let libs = pkg_config_query(name, "--libs")?;
    if cflags.trim().is_empty() && libs.trim().is_empty() {
        return Err(Error::UnresolvedNeed(name.to_string()));
    }
    Ok(Need { cflags, libs })
}

fn pkg_config_query(name: &str, flag: &str) -> Result<String> {
    let output = Command::new("pkg-config")
        .arg(flag)
        .arg(name)
        .output()
        .map_err(Error::ProcessExec)?;
    if !output.status.success() {
        return Ok(String::new());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Appends `name`'s resolved `cflags`/`libs` onto the given accumulators,
/// space-separated (§4.6 "Need-update").
pub fn need_update(names: &[String], cflags: &mut String, lflags: &mut String, need_path: Option<&str>) -> Result<()> {
    for name in names {
        let need = resolve(name, need_path)?;
        crate::path_util::cat(cflags, &need.cflags);
        crate::path_util::cat(lflags, &need.libs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_key_value_lines() {
        let map = parse_need_file("cflags=-I/usr/include\nlibs=-lfoo\n# comment\n");
        assert_eq!(map.get("cflags").unwrap(), "-I/usr/include");
        assert_eq!(map.get("libs").unwrap(), "-lfoo");
    }

    #[test]
    fn resolves_from_cwd_need_file_with_here_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let mut f = std::fs::File::create("foo.need").unwrap();
        writeln!(f, "cflags=-I${{HERE}}/include").unwrap();
        writeln!(f, "libs=-lfoo").unwrap();
        drop(f);

        let need = resolve("foo", None).unwrap();
        std::env::set_current_dir(prev).unwrap();

        assert!(need.cflags.ends_with("/include"));
        assert!(need.cflags.starts_with("-I"));
        assert_eq!(need.libs, "-lfoo");
    }

    #[test]
    fn need_update_appends_space_separated() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let mut f = std::fs::File::create("bar.need").unwrap();
        writeln!(f, "cflags=-DBAR").unwrap();
        writeln!(f, "libs=-lbar").unwrap();
        drop(f);

        let mut cflags = String::from("-Wall");
        let mut lflags = String::new();
        need_update(&["bar".to_string()], &mut cflags, &mut lflags, None).unwrap();
        std::env::set_current_dir(prev).unwrap();

        assert_eq!(cflags, "-Wall -DBAR");
        assert_eq!(lflags, "-lbar");
    }
}
