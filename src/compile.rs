//! Compile planner (§4.4): one `Target` per source file, emitting a `.o`,
//! plus a `Group` wrapping them all. `.d` files produced by a prior
//! `-MMD` compile are ingested so header changes are picked up on later
//! builds without a separate dependency-scanning pass.

use std::fs;

use crate::group::GroupRegistry;
use crate::path_util::{flag_concat, join, replace_extension};
use crate::target::{Action, Registry, TargetKind, TargetRef};

/// Parses a `.d` file's prerequisite list (§4.4, §6 "`.d` file format"):
/// skip to the first `:`, turn every `\` + newline pair into two spaces,
/// then split on whitespace. Returns `None` if the file is missing or has
/// no `:` at all (not a `.d` file), in which case the caller falls back to
/// `[source_file]`.
pub fn parse_dfile(contents: &str) -> Option<Vec<String>> {
    let colon = contents.find(':')?;
    let rest = &contents[colon + 1..];
    let unescaped = rest.replace("\\\n", "  ");
    let deps: Vec<String> = unescaped.split_whitespace().map(str::to_string).collect();
    Some(deps)
}

fn read_dfile_prereqs(dfile: &str, fallback: &str) -> Vec<String> {
    match fs::read_to_string(dfile) {
        Ok(contents) => parse_dfile(&contents).unwrap_or_else(|| vec![fallback.to_string()]),
        Err(_) => vec![fallback.to_string()],
    }
}

/// Builds one OBJ `Target` per file in `files` and wraps them in a `Group`.
/// `files` may itself contain Group names, which are expanded first
/// (e.g. when a compile directive's file list was produced by a `rule`).
pub fn compile_step(
    registry: &mut Registry,
    groups: &mut GroupRegistry,
    compiler: &str,
    files: &[String],
    cflags: &str,
    incdirs: &[String],
    defines: &[String],
    odir: &str,
) -> usize {
    let files = groups.expand(files);

    let mut cmd = format!("{} -c -Wall -MMD", compiler);
    if !cflags.trim().is_empty() {
        cmd.push(' ');
        cmd.push_str(cflags.trim());
    }
    let defs = flag_concat("-D", defines);
    if !defs.is_empty() {
        cmd.push(' ');
        cmd.push_str(&defs);
    }
    let incs = flag_concat("-I", incdirs);
    if !incs.is_empty() {
        cmd.push(' ');
        cmd.push_str(&incs);
    }

    let mut targets: Vec<TargetRef> = Vec::with_capacity(files.len());
    for file in &files {
        let obj = replace_extension(&join(odir, file), ".o");
        let dfile = replace_extension(&obj, ".d");
        let prereq = read_dfile_prereqs(&dfile, file);

        let action = Action::Command(format!("{} {} -o {}", cmd, file, obj));
        let t = registry.new_target(&obj, &prereq, action);
        {
            let mut data = t.borrow_mut();
            data.message = Some("compiling");
            data.kind = TargetKind::Obj;
        }
        targets.push(t);
    }

    groups.new_group(cmd, targets)
}
