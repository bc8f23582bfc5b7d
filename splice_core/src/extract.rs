//! Heuristic, line-oriented symbol extraction.
//!
//! This is a pattern scanner, not a parser. Each language family has a small
//! grammar of line-anchored rules; a declaration's extent comes from a
//! block-end finder that balances braces or follows indentation. Results are
//! hints: nested declarations inside function bodies are ignored, and
//! unusual formatting produces missing or overlapping symbols.

use std::fmt::Write as _;

use once_cell::sync::Lazy;
use regex::Regex;
use splice_api::{FileContext, Language, LanguageFamily, Symbol, SymbolKind};

const DEFAULT_MAX_SNIPPET_LINES: usize = 200;
const MAX_STATEMENT_LINES: usize = 64;

/// Knobs for [`extract_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Snippets longer than this are cut.
    pub max_snippet_lines: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_snippet_lines: DEFAULT_MAX_SNIPPET_LINES,
        }
    }
}

/// Extract symbols, imports, and exports from `source`.
///
/// `language_tag` is a language name or file extension; unknown tags fall
/// back to the generic scanner. Never fails.
#[must_use]
pub fn extract(source: &str, language_tag: &str) -> FileContext {
    extract_with(source, Language::from_tag(language_tag), ExtractOptions::default())
}

/// Extract with an explicit language and options.
#[must_use]
pub fn extract_with(source: &str, language: Language, options: ExtractOptions) -> FileContext {
    let grammar = Grammar::for_family(language.family());
    let lines: Vec<&str> = source.lines().collect();
    let depths = if grammar.indentation {
        vec![0; lines.len()]
    } else {
        line_depths(&lines, grammar.family)
    };

    let scanner = Scanner {
        grammar,
        lines: &lines,
        depths,
        options,
        frames: Vec::new(),
        context: FileContext::empty(language),
    };
    scanner.run()
}

/// Compact outline of a file's declarations, one per line.
///
/// ```text
/// # src/widget.ts (typescript)
/// imports: ./dom, react
/// L1-10 [class] Widget
/// L3-5 [function] render (Widget)
/// ```
#[must_use]
pub fn render_outline(path: &str, context: &FileContext) -> String {
    let mut out = format!("# {path} ({})\n", context.language);
    if !context.dependencies.is_empty() {
        let deps: Vec<&str> = context.dependencies.iter().map(String::as_str).collect();
        let _ = writeln!(out, "imports: {}", deps.join(", "));
    }
    for symbol in &context.symbols {
        if matches!(symbol.kind, SymbolKind::Import | SymbolKind::Export) {
            continue;
        }
        let _ = write!(
            out,
            "L{}-{} [{}] {}",
            symbol.start_line, symbol.end_line, symbol.kind, symbol.name
        );
        if let Some(scope) = &symbol.enclosing_scope {
            let _ = write!(out, " ({scope})");
        }
        out.push('\n');
    }
    out
}

struct Rule {
    kind: SymbolKind,
    pattern: Regex,
    member: bool,
}

struct Grammar {
    family: LanguageFamily,
    indentation: bool,
    statement_start: Option<Regex>,
    imports: Vec<Regex>,
    exports: Vec<Regex>,
    scopes: Vec<Regex>,
    rules: Vec<Rule>,
    comment_prefixes: &'static [&'static str],
}

#[allow(clippy::expect_used)]
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in extractor pattern is valid")
}

fn rule(kind: SymbolKind, pattern: &str) -> Rule {
    Rule {
        kind,
        pattern: re(pattern),
        member: false,
    }
}

fn member(kind: SymbolKind, pattern: &str) -> Rule {
    Rule {
        kind,
        pattern: re(pattern),
        member: true,
    }
}

const C_COMMENTS: &[&str] = &["//", "/*", "*"];

static ECMASCRIPT: Lazy<Grammar> = Lazy::new(|| Grammar {
    family: LanguageFamily::EcmaScript,
    indentation: false,
    statement_start: Some(re(
        r"^\s*(?:import\b|export\s*(?:type\s*)?(?:\*|\{)|(?:const|let|var)\s+[^=]+=\s*require\s*\()",
    )),
    imports: vec![
        re(r#"^\s*import\s+(?:type\s+)?(?:[\w$*{}\s,]+?\s+from\s+)?["'](?P<path>[^"']+)["']"#),
        re(r#"^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s+["'](?P<path>[^"']+)["']"#),
        re(r#"^\s*(?:const|let|var)\s+[^=]+=\s*require\s*\(\s*["'](?P<path>[^"']+)["']\s*\)"#),
    ],
    exports: vec![
        re(r"^\s*export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:function\s*\*?|class|const|let|var|interface|type|enum|namespace)?\s*(?P<name>[A-Za-z_$][\w$]*)"),
        re(r"^\s*export\s*(?:type\s*)?\{(?P<name>[^}]*)"),
        re(r"^\s*export\s*\*\s*(?:as\s+(?P<name>[\w$]+))?"),
    ],
    scopes: Vec::new(),
    rules: vec![
        rule(SymbolKind::Class, r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)"),
        rule(SymbolKind::Interface, r"^\s*(?:export\s+)?(?:declare\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)"),
        rule(SymbolKind::Type, r"^\s*(?:export\s+)?(?:declare\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^=]*>)?\s*="),
        rule(SymbolKind::Type, r"^\s*(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)"),
        rule(SymbolKind::Function, r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)"),
        rule(SymbolKind::Function, r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\(\s*$|(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=>)"),
        rule(SymbolKind::Variable, r"^\s*(?:export\s+)?(?:declare\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)"),
        member(SymbolKind::Function, r"^\s*(?:(?:public|private|protected|static|readonly|override)\s+)*(?P<name>[A-Za-z_$#][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=>"),
        member(SymbolKind::Function, r"^\s*(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*\*?(?P<name>[A-Za-z_$#][\w$]*)\s*\??\s*(?:<[^>]*>)?\s*\("),
        member(SymbolKind::Variable, r"^\s*(?:(?:public|private|protected|static|readonly|override|declare)\s+)*(?P<name>[A-Za-z_$#][\w$]*)\s*[?!]?\s*(?::[^=;(]+)?(?:=|;|$)"),
    ],
    comment_prefixes: C_COMMENTS,
});

static PYTHON: Lazy<Grammar> = Lazy::new(|| Grammar {
    family: LanguageFamily::Python,
    indentation: true,
    statement_start: Some(re(r"^\s*(?:import|from)\s")),
    imports: vec![
        re(r"^\s*import\s+(?P<path>[\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)"),
        re(r"^\s*from\s+(?P<path>\.+[\w.]*|[\w.]+)\s+import\b"),
    ],
    exports: vec![re(r"^(?P<name>__all__)\s*(?::[^=]+)?=")],
    scopes: Vec::new(),
    rules: vec![
        rule(SymbolKind::Class, r"^\s*class\s+(?P<name>[A-Za-z_]\w*)"),
        rule(SymbolKind::Function, r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)"),
        rule(SymbolKind::Type, r"^type\s+(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*="),
        rule(SymbolKind::Variable, r"^(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=(?:[^=]|$)"),
        member(SymbolKind::Variable, r"^\s+(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=(?:[^=]|$)"),
    ],
    comment_prefixes: &["#"],
});

const JVM_MODIFIERS: &str = r"(?:(?:public|private|protected|internal|abstract|final|sealed|static|open|data|partial|inner|override|virtual|async|suspend|inline|lateinit|const|implicit|lazy|readonly|synchronized|native|transient|volatile|extern|unsafe|new|case|enum|annotation|value|companion)\s+)";
const ANNOTATIONS: &str = r"(?:@\w+(?:\([^)]*\))?\s+)*";

static CLASS_ORIENTED: Lazy<Grammar> = Lazy::new(|| {
    let m = JVM_MODIFIERS;
    let a = ANNOTATIONS;
    Grammar {
        family: LanguageFamily::ClassOriented,
        indentation: false,
        statement_start: Some(re(r"^\s*(?:import|using)\s")),
        imports: vec![
            re(r"^\s*import\s+(?:static\s+)?(?P<path>[\w.]+(?:\.\*)?)"),
            re(r"^\s*using\s+(?:static\s+)?(?P<path>[A-Za-z_][\w.]*)\s*;"),
        ],
        exports: Vec::new(),
        scopes: Vec::new(),
        rules: vec![
            rule(SymbolKind::Interface, &format!(r"^\s*{a}{m}*(?:interface|trait)\s+(?P<name>\w+)")),
            rule(SymbolKind::Class, &format!(r"^\s*{a}{m}*(?:class|object|record|struct|enum)\s+(?P<name>\w+)")),
            rule(SymbolKind::Type, &format!(r"^\s*{m}*(?:typealias|type)\s+(?P<name>\w+)")),
            rule(SymbolKind::Function, &format!(r"^\s*{a}{m}*(?:fun|def)\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?(?P<name>\w+)")),
            rule(SymbolKind::Function, &format!(r"^\s*{a}{m}+(?:<[^>]+>\s+)?[\w<>\[\],.?]+\s+(?P<name>\w+)\s*\(")),
            member(SymbolKind::Function, &format!(r"^\s*{a}{m}+(?P<name>[A-Z]\w*)\s*\(")),
            rule(SymbolKind::Variable, &format!(r"^\s*{a}{m}*(?:val|var)\s+(?P<name>\w+)")),
            rule(SymbolKind::Variable, &format!(r"^\s*{a}{m}+[\w<>\[\],.?]+\s+(?P<name>\w+)\s*(?:=|;|\{{\s*get)")),
            member(SymbolKind::Function, r"^\s*(?:<[^>]+>\s+)?[\w<>\[\],.?]+\s+(?P<name>\w+)\s*\([^)]*\)?\s*(?:throws\s+[\w.,\s]+)?\{?\s*$"),
            member(SymbolKind::Variable, r"^\s*[\w<>\[\],.?]+\s+(?P<name>\w+)\s*(?:=[^=]|;)"),
        ],
        comment_prefixes: C_COMMENTS,
    }
});

const RUST_VIS: &str = r"(?:pub(?:\([^)]*\))?\s+)?";

static RUST: Lazy<Grammar> = Lazy::new(|| {
    let v = RUST_VIS;
    Grammar {
        family: LanguageFamily::Rust,
        indentation: false,
        statement_start: Some(re(&format!(
            r"^\s*{v}(?:use\s|extern\s+crate\s|mod\s+\w+\s*;)"
        ))),
        imports: vec![
            re(&format!(r"^\s*{v}use\s+(?P<path>(?:::)?[\w:]+)")),
            re(r"^\s*extern\s+crate\s+(?P<path>\w+)"),
            re(&format!(r"^\s*{v}mod\s+(?P<path>\w+)\s*;")),
        ],
        exports: vec![re(r"^\s*pub(?:\([^)]*\))?\s+use\s+(?P<name>(?:::)?[\w:]+)")],
        scopes: vec![re(
            r"^\s*(?:unsafe\s+)?impl(?:\s*<[^>]*>)?\s+(?:[\w:<>,\s&']+?\s+for\s+)?&?(?P<name>[\w:]+)",
        )],
        rules: vec![
            rule(SymbolKind::Class, &format!(r"^\s*{v}(?:struct|enum|union)\s+(?P<name>\w+)")),
            rule(SymbolKind::Interface, &format!(r"^\s*{v}(?:unsafe\s+)?(?:auto\s+)?trait\s+(?P<name>\w+)")),
            rule(SymbolKind::Type, &format!(r"^\s*{v}type\s+(?P<name>\w+)")),
            rule(SymbolKind::Function, &format!(r#"^\s*{v}(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>\w+)"#)),
            rule(SymbolKind::Variable, &format!(r"^\s*{v}(?:const|static)\s+(?:mut\s+)?(?P<name>[A-Za-z_]\w*)\s*:")),
        ],
        comment_prefixes: C_COMMENTS,
    }
});

static OTHER: Lazy<Grammar> = Lazy::new(|| Grammar {
    family: LanguageFamily::Other,
    indentation: false,
    statement_start: Some(re(r"^\s*(?:#\s*include|import|require|using)\b")),
    imports: vec![
        re(r#"^\s*#\s*include\s*[<"](?P<path>[^>"]+)[>"]"#),
        re(r#"^\s*import\s+(?:\w+\s+)?"(?P<path>[^"]+)""#),
        re(r#"^\s*require\s*\(?\s*["'](?P<path>[^"']+)["']"#),
    ],
    exports: Vec::new(),
    scopes: Vec::new(),
    rules: vec![
        rule(SymbolKind::Function, r"^\s*(?:(?:pub|public|private|static|export|async|local)\s+)*(?:function|func|fn|def|fun|sub|proc)\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_][\w.:]*)"),
        rule(SymbolKind::Function, r"^[A-Za-z_][\w\s\*&:<>,]*?[\s\*&](?P<name>[A-Za-z_]\w*)\s*\([^;]*\)\s*(?:const\s*)?\{?\s*$"),
    ],
    comment_prefixes: C_COMMENTS,
});

impl Grammar {
    fn for_family(family: LanguageFamily) -> &'static Self {
        match family {
            LanguageFamily::EcmaScript => &ECMASCRIPT,
            LanguageFamily::Python => &PYTHON,
            LanguageFamily::ClassOriented => &CLASS_ORIENTED,
            LanguageFamily::Rust => &RUST,
            LanguageFamily::Other => &OTHER,
        }
    }

    fn is_comment(&self, trimmed: &str) -> bool {
        self.comment_prefixes
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
    }
}

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "return", "new",
    "throw", "typeof", "await", "yield", "super", "this", "function", "sizeof", "delete", "in",
    "of", "match", "when", "with", "import", "export", "package",
];

#[derive(Debug)]
struct Frame {
    name: String,
    end: usize,
    body_depth: i32,
    container: bool,
}

struct Scanner<'a> {
    grammar: &'static Grammar,
    lines: &'a [&'a str],
    depths: Vec<i32>,
    options: ExtractOptions,
    frames: Vec<Frame>,
    context: FileContext,
}

impl Scanner<'_> {
    fn run(mut self) -> FileContext {
        let mut i = 0;
        while i < self.lines.len() {
            self.frames.retain(|frame| frame.end >= i);
            let trimmed = self.lines[i].trim();
            if trimmed.is_empty() || self.grammar.is_comment(trimmed) {
                i += 1;
                continue;
            }

            if let Some(end) = self.import_statement(i) {
                i = end + 1;
                continue;
            }

            self.export_statement(i);
            if !self.open_scope(i) {
                self.declaration(i);
            }
            i += 1;
        }
        self.context
    }

    fn import_statement(&mut self, start: usize) -> Option<usize> {
        let opener = self.grammar.statement_start.as_ref()?;
        if !opener.is_match(self.lines[start]) {
            return None;
        }

        let end = bracket_extent(self.lines, start, self.grammar.family);
        let statement = join_trimmed(&self.lines[start..=end]);
        let modules: Vec<String> = self
            .grammar
            .imports
            .iter()
            .find_map(|pattern| pattern.captures(&statement))
            .and_then(|captures| captures.name("path"))
            .map(|path| module_paths(path.as_str()))
            .unwrap_or_default();
        if modules.is_empty() {
            return None;
        }

        self.context.imports.push(statement.clone());
        for module in modules {
            self.context.dependencies.insert(module.clone());
            let mut symbol = Symbol::new(module, SymbolKind::Import, line_no(start), line_no(end));
            symbol.source_snippet.clone_from(&statement);
            self.context.symbols.push(symbol);
        }
        self.export_statement(start);
        Some(end)
    }

    fn export_statement(&mut self, line: usize) {
        let text = self.lines[line];
        let Some(captures) = self
            .grammar
            .exports
            .iter()
            .find_map(|pattern| pattern.captures(text))
        else {
            return;
        };

        let name = captures
            .name("name")
            .map(|name| name.as_str().trim().trim_end_matches("::").to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "*".to_owned());
        let statement = text.trim().to_owned();
        self.context.exports.push(statement.clone());
        let mut symbol = Symbol::new(name, SymbolKind::Export, line_no(line), line_no(line));
        symbol.source_snippet = statement;
        symbol.enclosing_scope = self.scope_name();
        self.context.symbols.push(symbol);
    }

    fn open_scope(&mut self, line: usize) -> bool {
        if !self.at_declaration_level(line) {
            return false;
        }
        let Some(name) = self
            .grammar
            .scopes
            .iter()
            .find_map(|pattern| pattern.captures(self.lines[line]))
            .and_then(|captures| captures.name("name"))
            .map(|name| last_segment(name.as_str()).to_owned())
        else {
            return false;
        };

        let end = self.block_end(line, SymbolKind::Class);
        self.frames.push(Frame {
            name,
            end,
            body_depth: self.depths[line] + 1,
            container: true,
        });
        true
    }

    fn declaration(&mut self, line: usize) {
        if !self.at_declaration_level(line) {
            return;
        }
        let in_container = self.frames.last().is_some_and(|frame| frame.container);
        let text = self.lines[line];
        let Some((kind, name)) = self.grammar.rules.iter().find_map(|rule| {
            if rule.member && !in_container {
                return None;
            }
            let name = rule.pattern.captures(text)?.name("name")?.as_str();
            if KEYWORDS.contains(&name) {
                return None;
            }
            Some((rule.kind, name.to_owned()))
        }) else {
            return;
        };

        let start = if self.grammar.indentation {
            decorated_start(self.lines, line)
        } else {
            line
        };
        let end = self.block_end(line, kind);
        let mut symbol = Symbol::new(name.clone(), kind, line_no(start), line_no(end));
        symbol.source_snippet = self.snippet(start, end);
        symbol.enclosing_scope = self.scope_name();
        self.context.symbols.push(symbol);

        if kind != SymbolKind::Variable && kind != SymbolKind::Type && end > line {
            self.frames.push(Frame {
                name,
                end,
                body_depth: self.depths[line] + 1,
                container: kind.is_container(),
            });
        }
    }

    fn at_declaration_level(&self, line: usize) -> bool {
        if self.frames.iter().any(|frame| !frame.container) {
            return false;
        }
        if self.grammar.indentation {
            return true;
        }
        let expected = self.frames.last().map_or(0, |frame| frame.body_depth);
        self.depths[line] == expected
    }

    fn scope_name(&self) -> Option<String> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.container)
            .map(|frame| frame.name.clone())
    }

    fn block_end(&self, start: usize, kind: SymbolKind) -> usize {
        if self.grammar.indentation {
            if kind == SymbolKind::Variable {
                bracket_extent(self.lines, start, self.grammar.family)
            } else {
                indent_block_end(self.lines, start)
            }
        } else {
            brace_block_end(self.lines, start, kind, self.grammar.family)
        }
    }

    fn snippet(&self, start: usize, end: usize) -> String {
        let last = end.min(start.saturating_add(self.options.max_snippet_lines.max(1) - 1));
        self.lines[start..=last].join("\n")
    }
}

fn line_no(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn join_trimmed(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn module_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| part.split_whitespace().next())
        .map(|path| {
            path.trim_end_matches("::")
                .trim_end_matches(".*")
                .to_owned()
        })
        .filter(|path| !path.is_empty())
        .collect()
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

fn decorated_start(lines: &[&str], line: usize) -> usize {
    let indent = indent_width(lines[line]);
    let mut start = line;
    while start > 0 {
        let previous = lines[start - 1];
        if previous.trim_start().starts_with('@') && indent_width(previous) == indent {
            start -= 1;
        } else {
            break;
        }
    }
    start
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|ch| ch.is_whitespace())
        .map(|ch| if ch == '\t' { 4 } else { 1 })
        .sum()
}

/// Last line of an indentation-delimited block opened at `start`.
///
/// The block ends before the first non-blank line indented at or left of the
/// declaration. Trailing blank lines are not part of the block.
fn indent_block_end(lines: &[&str], start: usize) -> usize {
    let base = indent_width(lines[start]);
    let header_end = bracket_extent(lines, start, LanguageFamily::Python);
    let mut end = header_end;
    for (index, line) in lines.iter().enumerate().skip(header_end + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if indent_width(line) <= base {
            break;
        }
        end = index;
    }
    end
}

/// Last line of the statement starting at `start`, following open brackets.
fn bracket_extent(lines: &[&str], start: usize, family: LanguageFamily) -> usize {
    let mut counter = CodeCounter::new(family);
    let mut balance = 0;
    let limit = lines.len().min(start + MAX_STATEMENT_LINES);
    for (index, line) in lines.iter().enumerate().take(limit).skip(start) {
        let stats = counter.scan(line);
        balance += stats.braces + stats.parens;
        if balance <= 0 {
            return index;
        }
    }
    start
}

/// Last line of a brace-delimited declaration starting at `start`.
///
/// Counts braces until the count returns to zero after going positive. A
/// declaration that never opens a brace ends at its terminating `;` or at the
/// first line that does not continue onto the next. Running off the end of
/// the file yields the last line.
fn brace_block_end(lines: &[&str], start: usize, kind: SymbolKind, family: LanguageFamily) -> usize {
    let mut counter = CodeCounter::new(family);
    let mut depth = 0;
    let mut parens = 0;
    let mut opened = false;

    for index in start..lines.len() {
        let stats = counter.scan(lines[index]);
        if depth + stats.peak > 0 {
            opened = true;
        }
        depth += stats.braces;
        parens += stats.parens;

        if opened {
            if depth <= 0 {
                return index;
            }
            continue;
        }
        if stats.last == Some(';') {
            return index;
        }
        if parens > 0 || stats.last.is_some_and(continues_statement) {
            continue;
        }
        if kind == SymbolKind::Variable || !next_line_continues(lines, index) {
            return index;
        }
    }

    lines.len().saturating_sub(1).max(start)
}

fn continues_statement(ch: char) -> bool {
    matches!(ch, ',' | '(' | '[' | '=' | '.' | ':' | '+' | '|' | '&' | '?' | '<' | '>')
}

fn next_line_continues(lines: &[&str], index: usize) -> bool {
    let Some(next) = lines[index + 1..]
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
    else {
        return false;
    };
    ["{", "=>", ":", ".", ")", "->", "?", "|", "&&", "where", "throws", "extends", "implements"]
        .iter()
        .any(|prefix| next.starts_with(prefix))
}

fn line_depths(lines: &[&str], family: LanguageFamily) -> Vec<i32> {
    let mut counter = CodeCounter::new(family);
    let mut depth = 0;
    lines
        .iter()
        .map(|line| {
            let at_start = depth;
            depth = (depth + counter.scan(line).braces).max(0);
            at_start
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct LineStats {
    braces: i32,
    peak: i32,
    parens: i32,
    last: Option<char>,
}

/// Counts brackets outside strings and comments, one line at a time.
#[derive(Debug)]
struct CodeCounter {
    family: LanguageFamily,
    in_block_comment: bool,
    in_template: bool,
}

impl CodeCounter {
    const fn new(family: LanguageFamily) -> Self {
        Self {
            family,
            in_block_comment: false,
            in_template: false,
        }
    }

    fn scan(&mut self, line: &str) -> LineStats {
        let chars: Vec<char> = line.chars().collect();
        let mut stats = LineStats::default();
        let mut quote: Option<char> = if self.in_template { Some('`') } else { None };
        let hash_comments = self.family == LanguageFamily::Python;
        let mut k = 0;

        while k < chars.len() {
            let ch = chars[k];
            let next = chars.get(k + 1).copied();

            if self.in_block_comment {
                if ch == '*' && next == Some('/') {
                    self.in_block_comment = false;
                    k += 2;
                } else {
                    k += 1;
                }
                continue;
            }

            if let Some(open) = quote {
                if ch == '\\' {
                    k += 2;
                    continue;
                }
                if ch == open {
                    quote = None;
                    stats.last = Some(ch);
                }
                k += 1;
                continue;
            }

            match ch {
                '/' if !hash_comments && next == Some('/') => break,
                '/' if !hash_comments && next == Some('*') => {
                    self.in_block_comment = true;
                    k += 2;
                    continue;
                }
                '#' if hash_comments => break,
                '"' => quote = Some('"'),
                '`' if self.family != LanguageFamily::Rust => quote = Some('`'),
                '\'' if self.family == LanguageFamily::Rust => {
                    k = skip_rust_quote(&chars, k);
                    stats.last = Some(ch);
                    continue;
                }
                '\'' => quote = Some('\''),
                '{' => {
                    stats.braces += 1;
                    stats.peak = stats.peak.max(stats.braces);
                }
                '}' => stats.braces -= 1,
                '(' | '[' => stats.parens += 1,
                ')' | ']' => stats.parens -= 1,
                _ => {}
            }
            if !ch.is_whitespace() {
                stats.last = Some(ch);
            }
            k += 1;
        }

        self.in_template = quote == Some('`');
        stats
    }
}

/// Index after a Rust `'` token: a char literal is skipped whole, a lifetime
/// only its quote.
fn skip_rust_quote(chars: &[char], at: usize) -> usize {
    match chars.get(at + 1) {
        Some('\\') => chars[at + 2..]
            .iter()
            .position(|&ch| ch == '\'')
            .map_or(at + 1, |offset| at + 3 + offset),
        Some(_) if chars.get(at + 2) == Some(&'\'') => at + 3,
        _ => at + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(context: &FileContext, kind: SymbolKind) -> Vec<&str> {
        context
            .symbols
            .iter()
            .filter(|symbol| symbol.kind == kind)
            .map(|symbol| symbol.name.as_str())
            .collect()
    }

    #[test]
    fn brace_function_ends_at_closing_brace() {
        let context = extract("function f() {\n  x();\n}\n", "javascript");
        let f = &context.symbols[0];
        assert_eq!((f.name.as_str(), f.kind), ("f", SymbolKind::Function));
        assert_eq!((f.start_line, f.end_line), (1, 3));
        assert_eq!(f.source_snippet, "function f() {\n  x();\n}");
    }

    #[test]
    fn unclosed_block_runs_to_last_line() {
        let context = extract("class A {\n  run() {\n    go();\n", "ts");
        let class = &context.symbols[0];
        assert_eq!(class.end_line, 3);
    }

    #[test]
    fn typescript_members_carry_scope() {
        let source = "\
import { h } from './dom';
import {
  render,
  mount,
} from \"./runtime\";

export class Widget {
  private count = 0;
  render(): void {
    const local = 1;
  }
  onClick = () => {
    this.count++;
  };
}

export const helper = (a: number) => a + 1;
const LIMIT = 10;
";
        let context = extract(source, "typescript");
        assert_eq!(context.imports.len(), 2);
        assert_eq!(context.imports[1], "import { render, mount, } from \"./runtime\";");
        assert!(context.dependencies.contains("./dom"));
        assert!(context.dependencies.contains("./runtime"));

        let render = context.symbols_named("render").next().expect("render");
        assert_eq!(render.enclosing_scope.as_deref(), Some("Widget"));
        assert_eq!((render.start_line, render.end_line), (9, 11));
        let on_click = context.symbols_named("onClick").next().expect("onClick");
        assert_eq!(on_click.kind, SymbolKind::Function);
        assert_eq!(on_click.end_line, 14);

        assert_eq!(names(&context, SymbolKind::Variable), ["count", "LIMIT"]);
        assert!(context.symbols_named("local").next().is_none());
        assert_eq!(names(&context, SymbolKind::Export), ["Widget", "helper"]);

        let helper = context
            .symbols
            .iter()
            .find(|s| s.name == "helper" && s.kind == SymbolKind::Function)
            .expect("helper");
        assert_eq!((helper.start_line, helper.end_line), (17, 17));
    }

    #[test]
    fn python_blocks_follow_indentation() {
        let source = "\
import os, sys as system
from ..util import helper

MAX = 3

class Store:
    limit = 5

    @property
    def size(self):
        return len(self.items)


def main():
    def inner():
        pass
    return Store()
";
        let context = extract(source, "py");
        assert_eq!(
            context.dependencies.iter().collect::<Vec<_>>(),
            ["..util", "os", "sys"]
        );
        let store = context.symbols_named("Store").next().expect("Store");
        assert_eq!((store.start_line, store.end_line), (6, 11));
        let size = context.symbols_named("size").next().expect("size");
        assert_eq!((size.start_line, size.end_line), (9, 11));
        assert_eq!(size.enclosing_scope.as_deref(), Some("Store"));
        let limit = context.symbols_named("limit").next().expect("limit");
        assert_eq!(limit.kind, SymbolKind::Variable);
        let main = context.symbols_named("main").next().expect("main");
        assert_eq!((main.start_line, main.end_line), (14, 17));
        assert!(context.symbols_named("inner").next().is_none());
        assert_eq!(names(&context, SymbolKind::Variable), ["MAX", "limit"]);
    }

    #[test]
    fn rust_impl_blocks_scope_methods() {
        let source = "\
use std::collections::{BTreeMap, BTreeSet};
mod config;

pub struct Registry<'a> {
    items: &'a str,
}

impl<'a> Display for Registry<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let brace = '{';
        write!(f, \"{}\", self.items)
    }
}

pub const LIMIT: usize = 4;
";
        let context = extract(source, "rust");
        assert!(context.dependencies.contains("std::collections"));
        assert!(context.dependencies.contains("config"));
        let registry = context.symbols_named("Registry").next().expect("Registry");
        assert_eq!((registry.start_line, registry.end_line), (4, 6));
        let fmt = context.symbols_named("fmt").next().expect("fmt");
        assert_eq!((fmt.start_line, fmt.end_line), (9, 12));
        assert_eq!(fmt.enclosing_scope.as_deref(), Some("Registry"));
        assert_eq!(names(&context, SymbolKind::Variable), ["LIMIT"]);
    }

    #[test]
    fn java_methods_and_fields() {
        let source = "\
package app;

import java.util.List;

public class Service {
    private final List<String> names = null;

    public Service() {
    }

    @Override
    public String toString() {
        return \"svc\";
    }

    void reset() {
        names.clear();
    }
}
";
        let context = extract(source, "java");
        assert!(context.dependencies.contains("java.util.List"));
        assert_eq!(
            names(&context, SymbolKind::Function),
            ["Service", "toString", "reset"]
        );
        assert_eq!(names(&context, SymbolKind::Variable), ["names"]);
        let reset = context.symbols_named("reset").next().expect("reset");
        assert_eq!((reset.start_line, reset.end_line), (16, 18));
        assert_eq!(reset.enclosing_scope.as_deref(), Some("Service"));
    }

    #[test]
    fn unknown_language_uses_generic_spellings() {
        let source = "#include <stdio.h>\n\nint main(void) {\n  if (x) {\n  }\n}\nfunc (s *Server) Start() {\n}\n";
        let context = extract(source, "cobol");
        assert_eq!(context.language, Language::Unknown);
        assert!(context.dependencies.contains("stdio.h"));
        assert_eq!(names(&context, SymbolKind::Function), ["main", "Start"]);
        assert!(extract("just prose\n", "").symbols.is_empty());
    }

    #[test]
    fn outline_lists_declarations() {
        let context = extract("import x from 'y';\nclass A {\n  go() {}\n}\n", "js");
        let outline = render_outline("a.js", &context);
        assert_eq!(
            outline,
            "# a.js (javascript)\nimports: y\nL2-4 [class] A\nL3-3 [function] go (A)\n"
        );
    }

    #[test]
    fn snippets_are_capped() {
        let source = "function f() {\n1\n2\n3\n}\n";
        let context = extract_with(
            source,
            Language::JavaScript,
            ExtractOptions {
                max_snippet_lines: 2,
            },
        );
        assert_eq!(context.symbols[0].source_snippet, "function f() {\n1");
        assert_eq!(context.symbols[0].end_line, 5);
    }

    #[test]
    fn unbounded_snippet_cap_keeps_the_whole_symbol() {
        let source = "function f() {\n1\n2\n}\n";
        let context = extract_with(
            source,
            Language::JavaScript,
            ExtractOptions {
                max_snippet_lines: usize::MAX,
            },
        );
        assert_eq!(context.symbols[0].source_snippet, "function f() {\n1\n2\n}");
    }
}
