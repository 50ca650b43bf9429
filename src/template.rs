//! One-pass template substitution, shared by the `@(VAR)` command templates
//! (§4.2) and the `${VAR}` need-file templates (§4.6). A single engine with
//! a configurable delimiter pair, as called for in the design notes.

use std::collections::HashMap;

use regex::Regex;

/// Substitutes every `{open}NAME{close}` occurrence in `text` using `vars`.
/// Unknown names expand to the empty string. One pass only: a substituted
/// value is never itself re-scanned for further variables, matching the
/// "no forward references" semantics of the original need-file expansion.
pub fn substitute(text: &str, open: &str, close: &str, vars: &HashMap<String, String>) -> String {
    let pattern = format!(
        "{}([A-Za-z_][A-Za-z0-9_]*){}",
        regex::escape(open),
        regex::escape(close)
    );
    let re = Regex::new(&pattern).expect("template delimiter pattern is well-formed");

    re.replace_all(text, |caps: &regex::Captures<'_>| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    })
    .into_owned()
}

/// Does `text` contain the opening delimiter at all? Used to decide whether
/// a command string should be treated as a template (`target()`, §4.2) or
/// passed through verbatim.
pub fn looks_like_template(text: &str, open: &str) -> bool {
    text.contains(open)
}
