//! Language detection and tree-sitter grammar registry.

use std::path::Path;

use crate::extractor::ChunkKind;

/// Supported language with its tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Python,
    JavaScript,
    TypeScript,
    Rust,
}

impl Lang {
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Rust => "rust",
        }
    }

    /// Get the tree-sitter grammar. Returns `None` if the
    /// corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-rust")]
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Map an AST node kind to the chunk kind it yields, if any.
    #[must_use]
    pub fn definition_kind(self, node_kind: &str) -> Option<ChunkKind> {
        match (self, node_kind) {
            (Self::Python, "function_definition") => Some(ChunkKind::Function),
            (Self::Python, "class_definition") => Some(ChunkKind::Class),
            (
                Self::JavaScript | Self::TypeScript,
                "function_declaration" | "method_definition",
            ) => Some(ChunkKind::Function),
            (Self::JavaScript | Self::TypeScript, "class_declaration") => Some(ChunkKind::Class),
            (Self::Rust, "function_item") => Some(ChunkKind::Function),
            (Self::Rust, "struct_item" | "enum_item" | "trait_item") => Some(ChunkKind::Class),
            _ => None,
        }
    }

    /// Node kinds that carry a definition's name as a direct child.
    #[must_use]
    pub fn name_node_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Python => &["identifier"],
            Self::JavaScript | Self::TypeScript => &["identifier", "property_identifier"],
            Self::Rust => &["identifier", "type_identifier"],
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect language from file extension.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "py" | "pyi" => Some(Lang::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "ts" | "tsx" | "mts" | "cts" => Some(Lang::TypeScript),
        "rs" => Some(Lang::Rust),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_by_extension() {
        assert_eq!(detect_language(Path::new("app/ingest.py")), Some(Lang::Python));
        assert_eq!(detect_language(Path::new("web/app.js")), Some(Lang::JavaScript));
        assert_eq!(detect_language(Path::new("web/app.ts")), Some(Lang::TypeScript));
        assert_eq!(detect_language(Path::new("src/main.rs")), Some(Lang::Rust));
    }

    #[test]
    fn detect_language_unknown_ext_returns_none() {
        assert_eq!(detect_language(Path::new("notes.md")), None);
        assert_eq!(detect_language(Path::new("file.xyz")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn python_definition_kinds() {
        assert_eq!(
            Lang::Python.definition_kind("function_definition"),
            Some(ChunkKind::Function)
        );
        assert_eq!(
            Lang::Python.definition_kind("class_definition"),
            Some(ChunkKind::Class)
        );
        assert_eq!(Lang::Python.definition_kind("if_statement"), None);
    }

    #[test]
    fn rust_type_definitions_are_classes() {
        assert_eq!(
            Lang::Rust.definition_kind("struct_item"),
            Some(ChunkKind::Class)
        );
        assert_eq!(
            Lang::Rust.definition_kind("trait_item"),
            Some(ChunkKind::Class)
        );
        assert_eq!(
            Lang::Rust.definition_kind("function_item"),
            Some(ChunkKind::Function)
        );
    }

    #[test]
    fn grammar_returns_some_for_enabled_features() {
        #[cfg(feature = "lang-python")]
        assert!(Lang::Python.grammar().is_some());
        #[cfg(feature = "lang-js")]
        {
            assert!(Lang::JavaScript.grammar().is_some());
            assert!(Lang::TypeScript.grammar().is_some());
        }
        #[cfg(feature = "lang-rust")]
        assert!(Lang::Rust.grammar().is_some());
    }
}
