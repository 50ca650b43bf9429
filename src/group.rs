//! Named, ordered collections of Targets (§3 "Group", §4.3) — the
//! mechanism that lets a compile directive's output feed a link directive's
//! input by name, and that lets `rule` register a user-named set of
//! generated targets.

use crate::target::TargetRef;

#[derive(Debug)]
pub struct GroupData {
    pub cmd: String,
    pub targets: Vec<TargetRef>,
    pub name: String,
}

/// The process-wide (build-scoped) Group registry, auto-naming anonymous
/// groups `*G001`, `*G002`, ... in creation order.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: Vec<GroupData>,
    counter: u32,
}

impl GroupRegistry {
    pub fn new() -> Self {
        GroupRegistry::default()
    }

    /// Registers a new group with an auto-assigned name.
    pub fn new_group(&mut self, cmd: impl Into<String>, targets: Vec<TargetRef>) -> usize {
        self.counter += 1;
        let name = format!("*G{:03}", self.counter);
        self.groups.push(GroupData { cmd: cmd.into(), targets, name });
        self.groups.len() - 1
    }

    /// Registers a new group under a caller-chosen name (used by `rule`,
    /// which names the group after the rule itself).
    pub fn new_named_group(&mut self, name: impl Into<String>, cmd: impl Into<String>, targets: Vec<TargetRef>) {
        self.groups.push(GroupData { cmd: cmd.into(), targets, name: name.into() });
    }

    pub fn by_name(&self, name: &str) -> Option<&GroupData> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group(&self, idx: usize) -> &GroupData {
        &self.groups[idx]
    }

    /// Replaces every occurrence of a Group name in `names` with that
    /// group's target names, in order; names that are not groups pass
    /// through unchanged (§4.3 `expand`).
    pub fn expand(&self, names: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(names.len());
        for n in names {
            match self.by_name(n) {
                Some(g) => out.extend(g.targets.iter().map(|t| t.borrow().name.clone())),
                None => out.push(n.clone()),
            }
        }
        out
    }
}
