//! Bundle emission.
//!
//! Modules are emitted into a registry (`__modules`) and instantiated lazily
//! through `__require`. Static `import`/`export` statements are rewritten to
//! registry lookups; bare specifiers are hoisted to top-level namespace
//! imports so the bundle stays a valid ES module.

use super::graph::{Module, ModuleGraph, ModuleId};
use super::resolve::Resolved;
use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

const PRELUDE: &str = "const __modules = {};
const __exports = {};

function __require(id) {
  if (__exports[id]) return __exports[id];
  const module = { exports: {} };
  __exports[id] = module.exports;
  __modules[id](module, module.exports, __require);
  return module.exports;
}
";

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($re).expect("import/export pattern is valid"))
        }
    };
}

pattern!(
    import_from,
    r#"(?m)^([ \t]*)import[ \t]+([\w$*{},\s]+?)\s+from[ \t]*['"]([^'"\n]+)['"][ \t]*;?"#
);
pattern!(
    import_bare,
    r#"(?m)^([ \t]*)import[ \t]*['"]([^'"\n]+)['"][ \t]*;?"#
);
pattern!(
    export_from,
    r#"(?m)^([ \t]*)export[ \t]*(\*(?:[ \t]+as[ \t]+[\w$]+)?|\{[^}]*\})\s*from[ \t]*['"]([^'"\n]+)['"][ \t]*;?"#
);
pattern!(export_list, r#"(?m)^([ \t]*)export[ \t]*\{([^}]*)\}[ \t]*;?"#);
pattern!(export_default, r#"(?m)^([ \t]*)export[ \t]+default[ \t]+"#);
pattern!(
    export_decl,
    r#"(?m)^([ \t]*)export[ \t]+((?:async[ \t]+)?function\*?|class|const|let|var)[ \t]+([\w$]+)"#
);

/// Specifiers of the static imports and re-exports in `code`, in source
/// order, without duplicates.
#[must_use]
pub fn import_specifiers(code: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for (re, group) in [(import_from(), 3), (import_bare(), 2), (export_from(), 3)] {
        for caps in re.captures_iter(code) {
            if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(group)) {
                found.push((whole.start(), spec.as_str().to_string()));
            }
        }
    }
    found.sort_by_key(|(offset, _)| *offset);

    let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !specifiers.contains(&spec) {
            specifiers.push(spec);
        }
    }
    specifiers
}

/// Emit `order` as one ES module that runs `entry` and default-exports its
/// exports object.
#[must_use]
pub fn emit_bundle(graph: &ModuleGraph, order: &[ModuleId], entry: ModuleId) -> String {
    let mut externals: Vec<String> = Vec::new();
    for module in order.iter().filter_map(|&id| graph.get(id)) {
        for (_, resolved) in &module.imports {
            if let Resolved::External(spec) = resolved {
                if !externals.contains(spec) {
                    externals.push(spec.clone());
                }
            }
        }
    }
    let bindings: HashMap<&str, String> = externals
        .iter()
        .enumerate()
        .map(|(i, spec)| (spec.as_str(), format!("__vizpack_ext_{i}")))
        .collect();

    let mut output = String::new();
    for spec in &externals {
        let _ = writeln!(
            output,
            "import * as {} from {};",
            bindings[spec.as_str()],
            json_string(spec)
        );
    }
    if !externals.is_empty() {
        output.push('\n');
    }
    output.push_str(PRELUDE);

    for module in order.iter().filter_map(|&id| graph.get(id)) {
        let _ = write!(
            output,
            "\n// {}\n__modules[{}] = function (module, exports, __require) {{\n{}\n}};\n",
            module.key,
            json_string(&module.key),
            rewrite_module(module, &bindings).trim_end()
        );
    }

    if let Some(entry) = graph.get(entry) {
        let _ = writeln!(output, "\nexport default __require({});", json_string(&entry.key));
    }
    output
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Rewrite one module's import/export statements to registry operations.
fn rewrite_module(module: &Module, externals: &HashMap<&str, String>) -> String {
    let require = |spec: &str| -> Option<String> {
        let (_, resolved) = module.imports.iter().find(|(s, _)| s == spec)?;
        match resolved {
            Resolved::Module(key) => Some(format!("__require({})", json_string(key))),
            Resolved::External(spec) => externals.get(spec.as_str()).cloned(),
        }
    };
    let mut temp = 0usize;
    let mut next_temp = || {
        temp += 1;
        format!("__vizpack_import_{temp}")
    };
    let mut pending: Vec<String> = Vec::new();

    let code = replace_keeping_lines(import_from(), &module.code, |caps| {
        let indent = &caps[1];
        let req = require(&caps[3])?;
        let binding = next_temp();
        let mut line = format!("{indent}const {binding} = {req};");
        let clause = ImportClause::parse(&caps[2]);
        if let Some(default) = clause.default {
            let _ = write!(line, " const {default} = {binding}.default;");
        }
        if let Some(namespace) = clause.namespace {
            let _ = write!(line, " const {namespace} = {binding};");
        }
        if !clause.named.is_empty() {
            let _ = write!(line, " const {{ {} }} = {binding};", clause.named.join(", "));
        }
        Some(line)
    });

    let code = replace_keeping_lines(import_bare(), &code, |caps| {
        let indent = &caps[1];
        match module.imports.iter().find(|(s, _)| s == &caps[2]) {
            Some((_, Resolved::External(_))) => Some(String::new()),
            _ => Some(format!("{indent}{};", require(&caps[2])?)),
        }
    });

    let code = replace_keeping_lines(export_from(), &code, |caps| {
        let indent = &caps[1];
        let req = require(&caps[3])?;
        let what = caps[2].trim();
        if what == "*" {
            return Some(format!("{indent}Object.assign(exports, {req});"));
        }
        if let Some(ns) = what.strip_prefix('*') {
            let ns = ns.trim().trim_start_matches("as").trim();
            return Some(format!("{indent}exports.{ns} = {req};"));
        }
        let binding = next_temp();
        let mut line = format!("{indent}const {binding} = {req};");
        for (local, exported) in export_names(what) {
            let _ = write!(line, " exports.{exported} = {binding}.{local};");
        }
        Some(line)
    });

    let code = replace_keeping_lines(export_list(), &code, |caps| {
        for (local, exported) in export_names(&caps[2]) {
            pending.push(format!("exports.{exported} = {local};"));
        }
        Some(String::new())
    });

    let code = replace_keeping_lines(export_default(), &code, |caps| {
        Some(format!("{}exports.default = ", &caps[1]))
    });

    let mut code = replace_keeping_lines(export_decl(), &code, |caps| {
        let name = &caps[3];
        pending.push(format!("exports.{name} = {name};"));
        Some(format!("{}{} {name}", &caps[1], &caps[2]))
    });

    for line in pending {
        code.push('\n');
        code.push_str(&line);
    }
    code
}

/// Replace every match for which `f` returns `Some`, padding with newlines
/// so the module keeps its line count.
fn replace_keeping_lines(
    re: &Regex,
    text: &str,
    mut f: impl FnMut(&Captures<'_>) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(replacement) = f(&caps) else { continue };
        out.push_str(&text[last..whole.start()]);
        out.push_str(&replacement);
        let lost = whole
            .as_str()
            .matches('\n')
            .count()
            .saturating_sub(replacement.matches('\n').count());
        out.extend(std::iter::repeat('\n').take(lost));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// `a, b as c` -> `[(a, a), (b, c)]`.
fn export_names(list: &str) -> Vec<(String, String)> {
    list.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| match n.split_once(" as ") {
            Some((local, exported)) => (local.trim().to_string(), exported.trim().to_string()),
            None => (n.to_string(), n.to_string()),
        })
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ImportClause {
    default: Option<String>,
    namespace: Option<String>,
    /// Destructuring patterns, `a` or `a: b`.
    named: Vec<String>,
}

impl ImportClause {
    fn parse(clause: &str) -> Self {
        let mut parsed = Self::default();
        let (outside, inside) = match (clause.find('{'), clause.rfind('}')) {
            (Some(open), Some(close)) if open < close => (
                format!("{}{}", &clause[..open], &clause[close + 1..]),
                Some(&clause[open + 1..close]),
            ),
            _ => (clause.to_string(), None),
        };

        if let Some(inside) = inside {
            parsed.named = export_names(inside)
                .into_iter()
                .map(|(imported, local)| {
                    if imported == local {
                        local
                    } else {
                        format!("{imported}: {local}")
                    }
                })
                .collect();
        }

        for part in outside.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.strip_prefix('*') {
                Some(rest) => {
                    parsed.namespace = Some(rest.trim().trim_start_matches("as").trim().to_string());
                }
                None => parsed.default = Some(part.to_string()),
            }
        }
        parsed
    }
}
