//! Lexical file-to-file dependency inference.
//!
//! Nothing here touches the filesystem. Relative imports are resolved against
//! the importing file's path with plain path algebra and matched against the
//! files the caller supplied contexts for.

use std::collections::{BTreeMap, BTreeSet};

use splice_api::{FileContext, Language, MultiFileChangeSet};

/// Importing file path to resolved file paths or external module names.
pub type DependencyGraph = BTreeMap<String, Vec<String>>;

const INDEX_STEMS: &[&str] = &["index", "__init__", "mod", "lib"];

/// Build the reference graph of `contexts`, keyed by file path.
///
/// Relative imports resolve to the supplied file they name when one matches
/// (with or without extension, or through an index module), otherwise to the
/// lexically resolved path. Other imports are kept as external module names.
#[must_use]
pub fn build_dependency_graph(contexts: &BTreeMap<String, FileContext>) -> DependencyGraph {
    contexts
        .iter()
        .map(|(path, context)| {
            let mut targets: Vec<String> = Vec::new();
            for dependency in &context.dependencies {
                let target = resolve_import(path, dependency, context.language)
                    .map_or_else(|| dependency.clone(), |resolved| match_known(&resolved, contexts));
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
            (path.clone(), targets)
        })
        .collect()
}

/// Files whose imports mention `symbol` or the identifier of `target`.
///
/// The check is textual and over-inclusive: a file importing anything whose
/// text contains the symbol name counts, as does any file whose resolved
/// dependencies include `target`. `target` itself is never reported.
#[must_use]
pub fn find_affected_files(
    target: &str,
    symbol: &str,
    contexts: &BTreeMap<String, FileContext>,
) -> Vec<String> {
    let identifiers = file_identifiers(target);
    let graph = build_dependency_graph(contexts);

    contexts
        .iter()
        .filter(|(path, _)| path.as_str() != target)
        .filter(|(path, context)| {
            let textual = context.imports.iter().any(|import| {
                (!symbol.is_empty() && import.contains(symbol))
                    || identifiers.iter().any(|identifier| import.contains(identifier.as_str()))
            });
            let resolved = graph
                .get(path.as_str())
                .is_some_and(|targets| targets.iter().any(|dependency| dependency == target));
            textual || resolved
        })
        .map(|(path, _)| path.clone())
        .collect()
}

/// Graph edges whose endpoints are both files of `change_set`, as `"a -> b"`.
#[must_use]
pub fn touched_edges(graph: &DependencyGraph, change_set: &MultiFileChangeSet) -> Vec<String> {
    let paths: BTreeSet<&str> = change_set.paths().collect();
    let mut edges = Vec::new();
    for (from, targets) in graph {
        if !paths.contains(from.as_str()) {
            continue;
        }
        for target in targets {
            if paths.contains(target.as_str()) {
                edges.push(format!("{from} -> {target}"));
            }
        }
    }
    edges
}

/// Whether `import` is written relative to the importing file.
#[must_use]
pub fn is_relative(import: &str) -> bool {
    import.starts_with("./") || import.starts_with("../") || import.starts_with('.')
}

fn resolve_import(from: &str, import: &str, language: Language) -> Option<String> {
    if !is_relative(import) {
        return None;
    }

    let relative = if language == Language::Python {
        python_relative(import)
    } else {
        import.to_owned()
    };
    Some(resolve_relative(from, &relative))
}

/// `..pkg.mod` becomes `../pkg/mod`: one leading dot is the current package.
fn python_relative(import: &str) -> String {
    let rest = import.trim_start_matches('.');
    let levels = import.len() - rest.len();
    let mut segments: Vec<&str> = vec![".."; levels.saturating_sub(1)];
    segments.extend(rest.split('.').filter(|segment| !segment.is_empty()));
    if segments.is_empty() {
        ".".to_owned()
    } else {
        segments.join("/")
    }
}

/// Resolve `relative` against the directory of `from`.
///
/// `..` beyond the root is kept, so `../x` from `a.ts` resolves to `../x`.
#[must_use]
pub fn resolve_relative(from: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = from.split('/').filter(|segment| !segment.is_empty()).collect();
    segments.pop();

    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            name => segments.push(name),
        }
    }
    segments.join("/")
}

fn match_known(resolved: &str, contexts: &BTreeMap<String, FileContext>) -> String {
    if contexts.contains_key(resolved) {
        return resolved.to_owned();
    }

    let with_extension = |path: &str| {
        path.strip_prefix(resolved)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|extension| !extension.contains('/'))
    };
    let index_module = |path: &str| {
        let dir = if resolved.is_empty() { String::new() } else { format!("{resolved}/") };
        path.strip_prefix(dir.as_str())
            .and_then(|rest| rest.split_once('.'))
            .is_some_and(|(stem, extension)| {
                INDEX_STEMS.contains(&stem) && !extension.contains('/')
            })
    };

    contexts
        .keys()
        .find(|path| with_extension(path))
        .or_else(|| contexts.keys().find(|path| index_module(path)))
        .cloned()
        .unwrap_or_else(|| resolved.to_owned())
}

/// Names an import may use to refer to `path`: its stem, or its directory for index modules.
fn file_identifiers(path: &str) -> Vec<String> {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file.split_once('.').map_or(file, |(stem, _)| stem);
    let mut identifiers = Vec::new();
    if INDEX_STEMS.contains(&stem) {
        let mut parts = path.rsplit('/');
        parts.next();
        if let Some(dir) = parts.next() {
            identifiers.push(dir.to_owned());
        }
    } else if !stem.is_empty() {
        identifiers.push(stem.to_owned());
    }
    identifiers
}
