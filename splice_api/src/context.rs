use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kind of declaration reported by the symbol extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Function, method, or callable binding.
    Function,
    /// Class, struct, enum, or other nominal container.
    Class,
    /// Variable or constant binding.
    Variable,
    /// Import or include statement.
    Import,
    /// Export statement.
    Export,
    /// Interface or trait.
    Interface,
    /// Type alias.
    Type,
}

impl SymbolKind {
    /// Lowercase label used in outlines.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::Export => "export",
            Self::Interface => "interface",
            Self::Type => "type",
        }
    }

    /// Whether symbols of this kind open a scope for nested declarations.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Class | Self::Interface)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Declared name (module path for imports).
    pub name: String,
    /// Kind of declaration.
    pub kind: SymbolKind,
    /// 1-based first line of the declaration.
    pub start_line: u32,
    /// 1-based last line of the declaration (inclusive).
    pub end_line: u32,
    /// Source text spanning the declaration.
    #[serde(default)]
    pub source_snippet: String,
    /// Name of the nearest enclosing class or type, if any.
    #[serde(default)]
    pub enclosing_scope: Option<String>,
}

impl Symbol {
    /// Construct a symbol without snippet or scope.
    pub fn new(name: impl Into<String>, kind: SymbolKind, start_line: u32, end_line: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line,
            end_line,
            source_snippet: String::new(),
            enclosing_scope: None,
        }
    }

    /// Number of lines spanned by the symbol.
    #[must_use]
    pub const fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

/// Language family that selects the extractor's rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageFamily {
    /// JavaScript and TypeScript dialects.
    EcmaScript,
    /// Indentation-delimited Python.
    Python,
    /// Java, Kotlin, C#, Scala.
    ClassOriented,
    /// Rust.
    Rust,
    /// Anything else; handled by the generic scanner.
    Other,
}

impl LanguageFamily {
    /// Whether declaration bodies are delimited by braces.
    #[must_use]
    pub const fn uses_braces(self) -> bool {
        !matches!(self, Self::Python)
    }
}

/// Source language of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// JavaScript (including JSX and module variants).
    JavaScript,
    /// TypeScript (including TSX).
    TypeScript,
    /// Python.
    Python,
    /// Java.
    Java,
    /// Kotlin.
    Kotlin,
    /// C#.
    CSharp,
    /// Scala.
    Scala,
    /// Rust.
    Rust,
    /// Unrecognized language tag.
    #[default]
    Unknown,
}

impl Language {
    /// Resolve a language tag or file extension, case-insensitively.
    ///
    /// Unrecognized tags map to [`Language::Unknown`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "javascript" | "js" | "jsx" | "mjs" | "cjs" | "javascriptreact" => Self::JavaScript,
            "typescript" | "ts" | "tsx" | "mts" | "cts" | "typescriptreact" => Self::TypeScript,
            "python" | "py" | "pyi" => Self::Python,
            "java" => Self::Java,
            "kotlin" | "kt" | "kts" => Self::Kotlin,
            "csharp" | "c#" | "cs" => Self::CSharp,
            "scala" | "sc" => Self::Scala,
            "rust" | "rs" => Self::Rust,
            _ => Self::Unknown,
        }
    }

    /// Detect the language from a file path's extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_tag)
    }

    /// Rule family used by the extractor.
    #[must_use]
    pub const fn family(self) -> LanguageFamily {
        match self {
            Self::JavaScript | Self::TypeScript => LanguageFamily::EcmaScript,
            Self::Python => LanguageFamily::Python,
            Self::Java | Self::Kotlin | Self::CSharp | Self::Scala => LanguageFamily::ClassOriented,
            Self::Rust => LanguageFamily::Rust,
            Self::Unknown => LanguageFamily::Other,
        }
    }

    /// Stable identifier, also used as the markdown fence tag in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::CSharp => "csharp",
            Self::Scala => "scala",
            Self::Rust => "rust",
            Self::Unknown => "text",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one extraction pass over a file.
///
/// A new pass supersedes the previous context; contexts are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileContext {
    /// Declarations in source order.
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    /// Raw import statements in source order.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Raw export statements in source order.
    #[serde(default)]
    pub exports: Vec<String>,
    /// Module paths referenced by the imports.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    /// Language the file was scanned as.
    #[serde(default)]
    pub language: Language,
}

impl FileContext {
    /// Create an empty context for the given language.
    #[must_use]
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }

    /// Iterate symbols with the given name.
    pub fn symbols_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols.iter().filter(move |symbol| symbol.name == name)
    }

    /// Innermost declaration (excluding imports and exports) covering `line`.
    #[must_use]
    pub fn symbol_at(&self, line: u32) -> Option<&Symbol> {
        self.symbols
            .iter()
            .filter(|symbol| !matches!(symbol.kind, SymbolKind::Import | SymbolKind::Export))
            .filter(|symbol| symbol.start_line <= line && line <= symbol.end_line)
            .min_by_key(|symbol| symbol.line_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tags_and_extensions_resolve() {
        assert_eq!(Language::from_tag("TypeScript"), Language::TypeScript);
        assert_eq!(Language::from_tag(".tsx"), Language::TypeScript);
        assert_eq!(Language::from_tag("cs"), Language::CSharp);
        assert_eq!(Language::from_tag("cobol"), Language::Unknown);
        assert_eq!(Language::from_path("src/app/main.py"), Language::Python);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn families_group_languages() {
        assert_eq!(Language::Kotlin.family(), LanguageFamily::ClassOriented);
        assert_eq!(Language::JavaScript.family(), LanguageFamily::EcmaScript);
        assert!(!LanguageFamily::Python.uses_braces());
        assert!(LanguageFamily::Other.uses_braces());
    }

    #[test]
    fn symbol_at_prefers_innermost() {
        let mut context = FileContext::empty(Language::TypeScript);
        context.symbols.push(Symbol::new("Widget", SymbolKind::Class, 1, 10));
        context.symbols.push(Symbol::new("render", SymbolKind::Function, 3, 5));
        context.symbols.push(Symbol::new("./dom", SymbolKind::Import, 4, 4));

        assert_eq!(context.symbol_at(4).map(|s| s.name.as_str()), Some("render"));
        assert_eq!(context.symbol_at(8).map(|s| s.name.as_str()), Some("Widget"));
        assert!(context.symbol_at(11).is_none());
    }

    #[test]
    fn context_defaults_are_applied() {
        let json = r#"{ "symbols": [{ "name": "f", "kind": "function", "start_line": 1, "end_line": 3 }] }"#;
        let context: FileContext = serde_json::from_str(json).expect("deserialize context");
        assert_eq!(context.language, Language::Unknown);
        assert!(context.imports.is_empty());
        assert_eq!(context.symbols[0].source_snippet, "");
        assert!(context.symbols[0].enclosing_scope.is_none());
    }
}
