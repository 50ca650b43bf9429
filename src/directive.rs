//! Directive decoding and dispatch (§4.7): turns one line of the helper
//! script's output into a parsed directive, and `Driver` applies it to the
//! in-progress `Registry`/`GroupRegistry`, mirroring `run_shmakefile` and
//! `straight_build` from the original tool.

use std::path::Path;

use log::{debug, info};

use crate::compile::compile_step;
use crate::error::{Error, Result};
use crate::group::GroupRegistry;
use crate::link::{link_step, LinkKind};
use crate::needs;
use crate::path_util::{cat, extension, replace_extension, split};
use crate::target::{target, Action, BuildOptions, Registry, TargetKind, TargetRef};
use crate::tool::{self, Lang};

/// Decodes one directive line: restores `\x01` to `\n`, then splits on `:`.
/// The first field is the tag, the rest are arguments (§4.7 step 3, §6).
pub fn decode_line(line: &str) -> Vec<String> {
    let restored = line.replace('\u{1}', "\n");
    let restored = restored.strip_prefix(':').unwrap_or(&restored);
    restored.split(':').map(str::to_string).collect()
}

/// Accumulated `set` defaults (§6 "`set` keys"). List-valued keys append;
/// scalar keys assign.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub libs: Vec<String>,
    pub needs: Vec<String>,
    pub cflags: String,
    pub lflags: String,
    pub opt: String,
    pub out_dir: String,
    /// Accepted (`set debug ...` is a valid key per §6) but never read:
    /// the original tool's `s_def.debug` is assigned in `set_defaults`/the
    /// `S` handler and never consulted again anywhere in `shmake.c`. The
    /// CLI's `-g` flag is the only thing that actually enables a debug
    /// build (see `Driver::cli_debug`).
    pub debug: bool,
    pub exports: bool,
    pub need_path: Option<String>,
    pub quiet: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            includes: Vec::new(),
            defines: Vec::new(),
            lib_dirs: Vec::new(),
            libs: Vec::new(),
            needs: Vec::new(),
            cflags: String::new(),
            lflags: String::new(),
            opt: "2".to_string(),
            out_dir: String::new(),
            debug: false,
            exports: false,
            need_path: None,
            quiet: false,
        }
    }
}

impl Defaults {
    /// Applies one `set KEY VALUE…` directive.
    pub fn apply(&mut self, key: &str, values: &[String]) -> Result<()> {
        let joined = values.join(" ");
        match key {
            "includes" => self.includes.extend(split(&joined)),
            "defines" => self.defines.extend(split(&joined)),
            "lib-dirs" => self.lib_dirs.extend(split(&joined)),
            "libs" => self.libs.extend(split(&joined)),
            "needs" => self.needs.extend(split(&joined)),
            "cflags" => cat(&mut self.cflags, &joined),
            "lflags" => cat(&mut self.lflags, &joined),
            "opt" => self.opt = joined,
            "out-dir" => self.out_dir = joined,
            "debug" => self.debug = str2bool(&joined),
            "exports" => self.exports = str2bool(&joined),
            "need-path" => self.need_path = Some(joined),
            "quiet" => self.quiet = str2bool(&joined),
            other => return Err(Error::UnknownSetKey(other.to_string())),
        }
        Ok(())
    }
}

fn str2bool(s: &str) -> bool {
    matches!(s.trim(), "1" | "true" | "yes" | "on")
}

/// Parsed form of a compile-and-link directive's argument list (§6
/// "Compile-directive argument grammar").
#[derive(Debug, Default)]
struct CompileArgs {
    includes: Vec<String>,
    defines: Vec<String>,
    libdirs: Vec<String>,
    libs: Vec<String>,
    needs: Vec<String>,
    debug: bool,
    exports: bool,
    opt: Option<String>,
    excludes: Vec<String>,
    rule_ext: Option<String>,
    outdir: Option<String>,
    name: String,
    files: Vec<String>,
}

fn parse_compile_args(args: &[String]) -> Result<CompileArgs> {
    let mut out = CompileArgs::default();
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let a = args[i].as_str();
        match a {
            "-I" => {
                out.includes.extend(split(next_val(args, &mut i, a)?));
            }
            "-D" => {
                out.defines.extend(split(next_val(args, &mut i, a)?));
            }
            "-L" => {
                out.libdirs.extend(split(next_val(args, &mut i, a)?));
            }
            "-l" => {
                out.libs.extend(split(next_val(args, &mut i, a)?));
            }
            "-n" => {
                out.needs.extend(split(next_val(args, &mut i, a)?));
            }
            "-x" => {
                out.excludes.extend(split(next_val(args, &mut i, a)?));
            }
            "-R" => {
                out.rule_ext = Some(next_val(args, &mut i, a)?.clone());
            }
            "-d" => {
                out.outdir = Some(next_val(args, &mut i, a)?.clone());
            }
            "-O" => {
                out.opt = Some(next_val(args, &mut i, a)?.clone());
            }
            "-g" => {
                out.debug = true;
                i += 1;
            }
            "-e" => {
                out.exports = true;
                i += 1;
            }
            _ => {
                positional.push(a.to_string());
                i += 1;
            }
        }
    }

    if positional.is_empty() {
        return Err(Error::BadDirectiveArgs("compile".to_string(), "missing name".to_string()));
    }
    out.name = positional.remove(0);
    out.files = positional;
    Ok(out)
}

fn next_val<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a String> {
    let v = args
        .get(*i + 1)
        .ok_or_else(|| Error::BadDirectiveArgs(flag.to_string(), "missing value".to_string()))?;
    *i += 2;
    Ok(v)
}

/// Owns the registries and accumulated defaults for one build; the
/// directive-dispatch counterpart to `run_shmakefile` + `straight_build`.
pub struct Driver {
    pub registry: Registry,
    pub groups: GroupRegistry,
    pub defaults: Defaults,
    pub opts: BuildOptions,
    pub platform: String,
    /// The CLI's global `-g` flag. Kept separate from `Defaults::debug`
    /// (which a buildfile's `set debug` directive writes) so that a
    /// directive processed after startup can never cancel `-g` — matching
    /// the original, where the two are distinct variables and `set debug`
    /// has no effect on the actual build.
    pub cli_debug: bool,
}

impl Driver {
    pub fn new(opts: BuildOptions, platform: String) -> Self {
        Driver {
            registry: Registry::new(),
            groups: GroupRegistry::new(),
            defaults: Defaults::default(),
            opts,
            platform,
            cli_debug: false,
        }
    }

    fn is_darwin(&self) -> bool {
        tool::is_darwin(&self.platform)
    }

    /// Dispatches one decoded directive line.
    pub fn dispatch(&mut self, fields: &[String]) -> Result<()> {
        if fields.is_empty() || fields[0].is_empty() {
            return Ok(());
        }
        let tag = fields[0].as_str();
        let args = &fields[1..];
        debug!("directive {} {:?}", tag, args);

        match tag {
            "C" => self.compile_and_link(Lang::C, false, args),
            "C99" => self.compile_and_link(Lang::C, true, args),
            "C++" => self.compile_and_link(Lang::Cpp, false, args),
            "C++11" => self.compile_and_link(Lang::Cpp, true, args),
            "target" => self.target_directive(args),
            "all" => self.all_directive(args),
            "set" => self.set_directive(args),
            "rule" => self.rule_directive(args),
            "quit" => self.quit_directive(args),
            other => Err(Error::BadDirectiveArgs(other.to_string(), "unknown directive".to_string())),
        }
    }

    fn target_directive(&mut self, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(Error::BadDirectiveArgs("target".to_string(), "missing name".to_string()));
        }
        let name = &args[0];
        let (prereqs, cmd): (&[String], &str) = if args.len() >= 2 {
            (&args[1..args.len() - 1], args.last().unwrap().as_str())
        } else {
            (&[], "none")
        };
        let expanded = self.groups.expand(prereqs);
        let cmd_opt = if cmd == "none" { None } else { Some(cmd) };
        target(&mut self.registry, name, &expanded, cmd_opt);
        Ok(())
    }

    fn all_directive(&mut self, args: &[String]) -> Result<()> {
        let expanded = self.groups.expand(args);
        self.registry.new_target("all", &expanded, Action::None);
        Ok(())
    }

    fn set_directive(&mut self, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(Error::BadDirectiveArgs("set".to_string(), "missing key".to_string()));
        }
        self.defaults.apply(&args[0], &args[1..])
    }

    fn quit_directive(&mut self, args: &[String]) -> Result<()> {
        if args.first().map(String::as_str) == Some("exists") {
            let var = args.get(1).cloned().unwrap_or_default();
            if std::env::var(&var).is_err() {
                return Err(Error::Quit(format!("required environment variable '{}' is not set", var)));
            }
            Ok(())
        } else {
            Err(Error::Quit(args.join(" ")))
        }
    }

    /// `rule NAME OUT-EXT COMMAND FILES…` (§4.7 "rule").
    fn rule_directive(&mut self, args: &[String]) -> Result<()> {
        let mut outdir = String::new();
        let mut rest: Vec<String> = Vec::new();
        let mut i = 0;
        while i < args.len() {
            if args[i] == "-d" {
                outdir = args.get(i + 1).cloned().unwrap_or_default();
                i += 2;
            } else {
                rest.push(args[i].clone());
                i += 1;
            }
        }

        if rest.len() < 3 {
            return Err(Error::BadDirectiveArgs("rule".to_string(), "expected name out-ext command files...".to_string()));
        }
        let name = rest[0].clone();
        let out_ext = rest[1].clone();
        let cmd_template = rest[2].clone();
        let files = self.groups.expand(&rest[3..]);

        let mut targets: Vec<TargetRef> = Vec::with_capacity(files.len());
        for file in &files {
            let output = if out_ext == "ditto" {
                file.clone()
            } else {
                crate::path_util::join(&outdir, &replace_extension(file, &out_ext))
            };
            let t = target(&mut self.registry, &output, &[file.clone()], Some(&cmd_template));
            targets.push(t);
        }
        self.groups.new_named_group(name, cmd_template, targets);
        Ok(())
    }

    /// Compile-and-link directive (`C`/`C99`/`C++`/`C++11`, §4.7). Builds
    /// one independent program per input file when `-R` is present;
    /// otherwise delegates straight to `straight_build`.
    fn compile_and_link(&mut self, lang: Lang, std99_or_11: bool, raw_args: &[String]) -> Result<()> {
        let args = parse_compile_args(raw_args)?;

        let mut compiler = tool::discover_compiler(lang)?;
        if std99_or_11 {
            let std_flag = match lang {
                Lang::C => "-std=c99",
                Lang::Cpp => "-std=c++0x",
            };
            compiler = format!("{} {}", compiler, std_flag);
        }
        info!("selected compiler: {}", compiler);

        if let Some(rule_ext) = &args.rule_ext {
            // `-R .so a.c b.c` generates a group of linker targets, one per
            // input file, each named by rewriting that file's extension
            // (the literal `exe` extension means "no extension").
            let out_ext = if rule_ext == "exe" { "" } else { rule_ext.as_str() };
            let mut targets = Vec::new();
            for file in &args.files {
                let output_file = replace_extension(file, out_ext);
                let t = self.straight_build(&compiler, &output_file, &[file.clone()], &args)?;
                targets.push(t);
            }
            self.groups.new_named_group(args.name.clone(), compiler, targets);
            Ok(())
        } else {
            self.straight_build(&compiler, &args.name, &args.files, &args)?;
            Ok(())
        }
    }

    /// The highest-value control logic (§4.7 `straight_build`): turns a
    /// name + file list into a fully wired compile Group and link Target,
    /// promoting the result to the front of the registry.
    fn straight_build(
        &mut self,
        compiler: &str,
        name: &str,
        files: &[String],
        args: &CompileArgs,
    ) -> Result<TargetRef> {
        // Needs are resolved onto empty accumulators first; `defaults.cflags`
        // is appended afterward (in the cflags assembly below) and
        // `defaults.lflags`, if set, *replaces* whatever needs contributed
        // to lflags rather than appending to it — both orderings mirror
        // `update_needs`/`compile_from_args`/`link_from_args` exactly.
        let mut cflags = String::new();
        let mut lflags = String::new();

        let mut need_names = args.needs.clone();
        need_names.extend(self.defaults.needs.iter().cloned());
        if !need_names.is_empty() {
            needs::need_update(&need_names, &mut cflags, &mut lflags, self.defaults.need_path.as_deref())?;
        }

        let (mut name, mut files) = (name.to_string(), files.to_vec());
        if files.is_empty() {
            files = vec![name.clone()];
            name = replace_extension(&name, "");
        }

        if !args.excludes.is_empty() {
            files.retain(|f| !args.excludes.contains(f));
        }

        let ext = extension(&name);
        let kind = match ext.as_str() {
            ".so" => {
                cat(&mut lflags, "-shared");
                if !self.is_darwin() {
                    cat(&mut cflags, "-fpic");
                }
                LinkKind::So
            }
            ".a" => LinkKind::Lib,
            ".c" | ".cc" | ".cpp" | ".cxx" => {
                files.push(name.clone());
                name = replace_extension(&name, "");
                LinkKind::Exe
            }
            _ => LinkKind::Exe,
        };

        let (lib_inputs, source_inputs): (Vec<String>, Vec<String>) = files
            .into_iter()
            .partition(|f| matches!(extension(f).as_str(), ".a" | ".so"));

        let odir = if let Some(d) = &args.outdir {
            expand_auto_outdir(d, compiler, args.debug || self.cli_debug)
        } else if !self.defaults.out_dir.is_empty() {
            expand_auto_outdir(&self.defaults.out_dir, compiler, args.debug || self.cli_debug)
        } else {
            String::new()
        };

        if !self.defaults.cflags.is_empty() {
            cat(&mut cflags, &self.defaults.cflags);
        }

        let debug = args.debug || self.cli_debug;
        if debug {
            cat(&mut cflags, "-g");
        } else {
            let opt = args.opt.clone().unwrap_or_else(|| self.defaults.opt.clone());
            cat(&mut cflags, &format!("-O{}", opt));
        }

        let mut includes = self.defaults.includes.clone();
        includes.extend(args.includes.iter().cloned());
        let mut defines = self.defaults.defines.clone();
        defines.extend(args.defines.iter().cloned());

        // `set lflags` overwrites whatever needs/`-shared` contributed to
        // lflags up to this point, rather than appending to it.
        if !self.defaults.lflags.is_empty() {
            lflags = self.defaults.lflags.clone();
        }

        if kind == LinkKind::Exe {
            let exports = args.exports || self.defaults.exports;
            if exports {
                if !self.is_darwin() {
                    cat(&mut lflags, "-Wl,-E");
                }
            } else if !debug {
                cat(&mut lflags, "-Wl,-s");
            }
        }

        let compile_idx = compile_step(
            &mut self.registry,
            &mut self.groups,
            compiler,
            &source_inputs,
            &cflags,
            &includes,
            &defines,
            &odir,
        );
        let compile_group_name = self.groups.group(compile_idx).name.clone();

        let mut libdirs = self.defaults.lib_dirs.clone();
        libdirs.extend(args.libdirs.iter().cloned());
        let mut libs = self.defaults.libs.clone();
        libs.extend(args.libs.iter().cloned());

        let mut inputs = vec![Some(compile_group_name)];
        inputs.extend(lib_inputs.into_iter().map(Some));

        let t = link_step(
            &mut self.registry,
            &mut self.groups,
            compiler,
            &name,
            &inputs,
            &lflags,
            &libdirs,
            &libs,
            kind,
        );
        self.registry.push_to_front(&t);
        Ok(t)
    }

    /// After all directives have been processed: pick the root target
    /// (§4.7, "select root target") and run the freshness check on it.
    pub fn finish(&mut self, requested: Option<&str>) -> Result<()> {
        if self.registry.is_empty() {
            return Err(Error::NoTargets);
        }

        let wanted = requested.unwrap_or("all");
        let root = match self.registry.by_name(wanted) {
            Some(t) => t,
            None if wanted == "clean" => {
                let verbose = self.opts.verbose_level > 0;
                for t in self.registry.all() {
                    crate::target::remove(t, verbose);
                }
                return Ok(());
            }
            None => {
                if requested.is_some() && wanted != "all" {
                    return Err(Error::NoSuchTarget(wanted.to_string()));
                }
                self.registry.first().expect("checked non-empty above")
            }
        };

        crate::target::check(&root, &self.opts)?;
        Ok(())
    }
}

fn expand_auto_outdir(spec: &str, compiler: &str, debug: bool) -> String {
    if spec == "auto" {
        let tag = if debug { "debug" } else { "release" };
        let base = Path::new(compiler)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| compiler.to_string());
        format!("{}-{}", base, tag)
    } else {
        spec.to_string()
    }
}
