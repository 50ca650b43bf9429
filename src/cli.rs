//! Driver CLI (§4.10, §6): flag-based, no subcommands — mirrors the
//! external driver interface directly rather than the teacher's
//! project-scoped `new`/`build`/`run`/`clean` subcommands.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "A shell-scriptable build orchestrator", long_about = None)]
pub struct Cli {
    /// Buildfile path.
    #[arg(short = 'f', default_value = "buildfile")]
    pub buildfile: PathBuf,

    /// Change to this directory before running.
    #[arg(short = 'C')]
    pub chdir: Option<PathBuf>,

    /// Testing mode: print actions but do not execute them.
    #[arg(short = 't')]
    pub testing: bool,

    /// Global debug build.
    #[arg(short = 'g')]
    pub debug: bool,

    /// Verbose (repeat for extra verbosity: `-vv`).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet: suppress per-target progress messages.
    #[arg(short = 'q')]
    pub quiet: bool,

    /// Scaffold a starter buildfile whose body is STMT, then exit.
    #[arg(short = 'c', value_name = "STMT")]
    pub scaffold: Option<String>,

    /// Either `KEY=VALUE` pairs (exported into the buildfile's
    /// environment) or a single target name.
    pub args: Vec<String>,
}

impl Cli {
    /// Splits `args` into environment assignments and an optional target
    /// name (§6 "Positional arguments").
    pub fn split_args(&self) -> (Vec<(String, String)>, Option<String>) {
        let mut env = Vec::new();
        let mut target = None;
        for a in &self.args {
            match a.split_once('=') {
                Some((k, v)) => env.push((k.to_string(), v.to_string())),
                None => target = Some(a.clone()),
            }
        }
        (env, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn split_args_separates_env_from_target() {
        let cli = Cli {
            buildfile: "buildfile".into(),
            chdir: None,
            testing: false,
            debug: false,
            verbose: 0,
            quiet: false,
            scaffold: None,
            args: vec!["FOO=bar".to_string(), "hello".to_string()],
        };
        let (env, target) = cli.split_args();
        assert_eq!(env, vec![("FOO".to_string(), "bar".to_string())]);
        assert_eq!(target, Some("hello".to_string()));
    }
}
