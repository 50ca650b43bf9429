mod cli;
mod compile;
mod directive;
mod error;
mod file;
mod group;
mod link;
mod needs;
mod path_util;
mod scaffold;
mod target;
mod template;
mod tool;

use std::fs;
use std::process::Command;

use clap::Parser;
use log::info;

use cli::Cli;
use directive::{decode_line, Driver};
use error::{Error, Result};
use target::BuildOptions;

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        std::process::exit(error::report(&e));
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(stmt) = &cli.scaffold {
        scaffold::scaffold_buildfile(stmt)?;
        return Ok(());
    }

    if let Some(dir) = &cli.chdir {
        std::env::set_current_dir(dir).map_err(|e| Error::ChdirFailed(dir.clone(), e))?;
    }

    if !cli.buildfile.exists() {
        return Err(Error::BuildfileMissing(cli.buildfile.clone()));
    }

    let platform = tool::platform();
    std::env::set_var("PLAT", &platform);
    info!("platform: {}", platform);

    scaffold::ensure_helper()?;

    let (env_vars, requested_target) = cli.split_args();
    for (k, v) in &env_vars {
        std::env::set_var(k, v);
    }

    let tmp_path = std::env::temp_dir().join(format!("shmake.{}", std::process::id()));
    run_buildfile(&cli.buildfile, &tmp_path)?;

    let opts = BuildOptions {
        verbose_level: cli.verbose,
        quiet: cli.quiet,
        testing: cli.testing,
    };
    let mut driver = Driver::new(opts, platform);
    driver.cli_debug = cli.debug;

    let contents = fs::read_to_string(&tmp_path).map_err(|e| Error::DirectiveFileOpen(tmp_path.clone(), e))?;
    let _ = fs::remove_file(&tmp_path);

    for line in contents.lines() {
        if line.is_empty() {
            continue;
        }
        let fields = decode_line(line);
        driver.dispatch(&fields)?;
    }

    driver.finish(requested_target.as_deref())
}

/// Runs `./buildfile <tmp_path>` through the system shell (§4.7 step 2).
fn run_buildfile(buildfile: &std::path::Path, tmp_path: &std::path::Path) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("./{} {}", buildfile.display(), tmp_path.display()))
        .status()
        .map_err(Error::ProcessExec)?;

    if !status.success() {
        return Err(Error::BuildfileFailed(buildfile.to_path_buf()));
    }
    Ok(())
}
