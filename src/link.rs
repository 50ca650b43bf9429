//! Link planner (§4.5): flattens Group references in `inputs` into a single
//! Target's prerequisite list, and builds an `ar`/`ranlib` command for
//! static archives or a direct linker invocation otherwise.

use log::info;

use crate::group::GroupRegistry;
use crate::path_util::flag_concat;
use crate::target::{depends_as_str, Action, Registry, TargetKind, TargetRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, parse_display::Display, educe::Educe)]
#[educe(Default)]
pub enum LinkKind {
    #[display("executable")]
    #[educe(Default)]
    Exe,
    #[display("shared library")]
    So,
    #[display("static library")]
    Lib,
    /// Reserved for parity with the original tool's `LINK_STATIC`; nothing
    /// in the directive protocol currently produces it (static-vs-shared
    /// is decided by `name`'s extension in `straight_build`, which only
    /// ever yields `Exe`, `So`, or `Lib`).
    #[display("static (reserved)")]
    Static,
}

/// `inputs` may name Groups (replaced by their member target names, in
/// order) or bare object/library paths (passed through). A `None` entry
/// reserves a slot — used by `straight_build` to place the compile Group
/// at position 0 even when there happen to be no compiled sources.
pub fn link_step(
    registry: &mut Registry,
    groups: &mut GroupRegistry,
    linker: &str,
    name: &str,
    inputs: &[Option<String>],
    lflags: &str,
    libdirs: &[String],
    libs: &[String],
    kind: LinkKind,
) -> TargetRef {
    info!("linking {} as {}", name, kind);
    let present: Vec<String> = inputs.iter().flatten().cloned().collect();
    let flattened = groups.expand(&present);

    let t = registry.new_target(name, &flattened, Action::None);

    let obj_files = depends_as_str(&t.borrow());
    let cmd = match kind {
        LinkKind::Lib | LinkKind::Static => {
            format!("ar rcu {} {}; ranlib {}", name, obj_files, name)
        }
        LinkKind::Exe | LinkKind::So => {
            let mut parts = vec![linker.to_string(), obj_files];
            if !lflags.trim().is_empty() {
                parts.push(lflags.trim().to_string());
            }
            let ldirs = flag_concat("-L", libdirs);
            if !ldirs.is_empty() {
                parts.push(ldirs);
            }
            let llibs = flag_concat("-l", libs);
            if !llibs.is_empty() {
                parts.push(llibs);
            }
            parts.push(format!("-o {}", name));
            parts.join(" ")
        }
    };

    {
        let mut data = t.borrow_mut();
        data.action = Action::Command(cmd);
        data.message = Some("linking");
        data.kind = TargetKind::Prog;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Action;

    #[test]
    fn lib_kind_builds_ar_ranlib_command() {
        let mut registry = Registry::new();
        let mut groups = GroupRegistry::new();
        registry.new_target("a.o", &[], Action::None);
        let t = link_step(
            &mut registry,
            &mut groups,
            "gcc",
            "libfoo.a",
            &[Some("a.o".to_string())],
            "",
            &[],
            &[],
            LinkKind::Lib,
        );
        match &t.borrow().action {
            Action::Command(c) => assert_eq!(c, "ar rcu libfoo.a a.o; ranlib libfoo.a"),
            _ => panic!("expected command"),
        }
    }

    #[test]
    fn exe_kind_builds_linker_command_with_flags() {
        let mut registry = Registry::new();
        let mut groups = GroupRegistry::new();
        registry.new_target("a.o", &[], Action::None);
        let t = link_step(
            &mut registry,
            &mut groups,
            "gcc",
            "hello",
            &[Some("a.o".to_string())],
            "-Wl,-s",
            &["lib".to_string()],
            &["m".to_string()],
            LinkKind::Exe,
        );
        match &t.borrow().action {
            Action::Command(c) => {
                assert_eq!(c, "gcc a.o -Wl,-s -Llib -lm -o hello");
            }
            _ => panic!("expected command"),
        }
    }

    #[test]
    fn group_references_are_flattened_in_order() {
        let mut registry = Registry::new();
        let mut groups = GroupRegistry::new();
        let a = registry.new_target("a.o", &[], Action::None);
        let b = registry.new_target("b.o", &[], Action::None);
        groups.new_named_group("objs", "cc", vec![a, b]);

        let t = link_step(
            &mut registry,
            &mut groups,
            "gcc",
            "hello",
            &[Some("objs".to_string())],
            "",
            &[],
            &[],
            LinkKind::Exe,
        );
        assert_eq!(t.borrow().prereq.len(), 2);
        assert_eq!(t.borrow().prereq[0].name(), "a.o");
        assert_eq!(t.borrow().prereq[1].name(), "b.o");
    }

    #[test]
    fn none_slots_are_skipped() {
        let mut registry = Registry::new();
        let mut groups = GroupRegistry::new();
        let t = link_step(
            &mut registry,
            &mut groups,
            "gcc",
            "hello",
            &[None, Some("lib.a".to_string())],
            "",
            &[],
            &[],
            LinkKind::Exe,
        );
        assert_eq!(t.borrow().prereq.len(), 1);
        assert_eq!(t.borrow().prereq[0].name(), "lib.a");
    }
}
