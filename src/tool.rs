//! Compiler discovery, generalized from the teacher's `Tool`/`ToolFamily`
//! abstraction (which picked amongst Gnu/Clang/MSVC for a `cc`-rs style
//! build). This tool is POSIX-only (§1 Non-goals exclude Windows path
//! semantics) and the directive protocol is itself the source of compiler
//! flags (§4.4–§4.7), so `Tool` is reduced to exactly what §4.7's
//! `setup_compiler` and §4.11's `PLAT`/`macosx` checks need: which compiler
//! program to invoke, and which platform we're running on.

use std::process::Command;

use log::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    C,
    Cpp,
}

/// Does `cmd` exist on `$PATH`? Mirrors the original `exists_command!`
/// macro's "try running it with -v" probe.
fn exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Resolves the compiler program name for `lang`: `$CC`/`$CXX` if set,
/// otherwise the first of the discovery candidates found on `$PATH`
/// (§4.7 `setup_compiler`: `gcc` then `cc` for C, `g++` then `c++` for
/// C++). Only the program name is returned — the original tool shells out
/// to `basename $(which ...)`, and the directive protocol always invokes
/// the compiler through a shell, so a bare name (resolved again by the
/// shell's own `$PATH` lookup at fire time) is exactly equivalent and
/// keeps the generated command lines readable.
pub fn discover_compiler(lang: Lang) -> Result<String> {
    let (env_var, candidates): (&str, &[&str]) = match lang {
        Lang::C => ("CC", &["gcc", "cc"]),
        Lang::Cpp => ("CXX", &["g++", "c++"]),
    };

    if let Ok(over) = std::env::var(env_var) {
        if !over.is_empty() {
            info!("using ${} override: {}", env_var, over);
            return Ok(over);
        }
    }

    for candidate in candidates {
        if exists(candidate) {
            info!("discovered compiler {:?}: {}", lang, candidate);
            return Ok((*candidate).to_string());
        }
    }

    Err(Error::NoCompilerFound)
}

/// The platform name as reported by `uname`, exported into the buildfile's
/// environment as `$PLAT` (§6 "Environment").
pub fn platform() -> String {
    Command::new("uname")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default()
}

pub fn is_darwin(plat: &str) -> bool {
    plat == "Darwin"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_over_discovery() {
        std::env::set_var("CC", "my-special-cc");
        let cc = discover_compiler(Lang::C).unwrap();
        std::env::remove_var("CC");
        assert_eq!(cc, "my-special-cc");
    }

    #[test]
    fn darwin_detection() {
        assert!(is_darwin("Darwin"));
        assert!(!is_darwin("Linux"));
    }
}
