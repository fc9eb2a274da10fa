//! Definition-level chunk extraction via tree-sitter.

use tree_sitter::{Node, Parser};

use crate::languages::Lang;

/// What kind of definition a chunk captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Function,
    Class,
}

impl ChunkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted definition with its location.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub kind: ChunkKind,
    pub name: Option<String>,
    pub file: String,
    /// 1-based line of the definition's first character.
    pub start_line: usize,
}

/// Cut `source` into function and class definition chunks.
///
/// Traversal is depth-first pre-order over the whole tree, so definitions
/// nested inside others (methods, inner functions) become chunks of their
/// own in addition to the enclosing one. A file that fails to parse, or a
/// language whose grammar feature is disabled, yields zero chunks.
#[must_use]
pub fn extract_chunks(source: &str, lang: Lang, file: &str) -> Vec<Chunk> {
    let Some(grammar) = lang.grammar() else {
        tracing::debug!(file, lang = %lang, "no grammar available, skipping");
        return Vec::new();
    };

    let mut parser = Parser::new();
    if parser.set_language(&grammar).is_err() {
        tracing::warn!(file, lang = %lang, "grammar rejected by parser, skipping");
        return Vec::new();
    }
    let Some(tree) = parser.parse(source, None) else {
        tracing::warn!(file, lang = %lang, "parse failed, skipping");
        return Vec::new();
    };

    let mut chunks = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if let Some(kind) = lang.definition_kind(node.kind()) {
            chunks.push(Chunk {
                content: source[node.byte_range()].to_string(),
                kind,
                name: definition_name(&node, source, lang),
                file: file.to_string(),
                start_line: node.start_position().row + 1,
            });
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    chunks
}

/// First direct child that looks like the definition's name.
fn definition_name(node: &Node, source: &str, lang: Lang) -> Option<String> {
    let name_kinds = lang.name_node_kinds();
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .find(|child| name_kinds.contains(&child.kind()))
        .map(|child| source[child.byte_range()].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_functions_and_classes() {
        let source = "\
def top():
    pass

class Greeter:
    def greet(self):
        return 'hi'
";
        let chunks = extract_chunks(source, Lang::Python, "app.py");
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(
            names,
            vec![Some("top"), Some("Greeter"), Some("greet")]
        );
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        assert_eq!(chunks[1].kind, ChunkKind::Class);
    }

    #[test]
    fn nested_definitions_become_separate_chunks() {
        let source = "\
def outer():
    def inner():
        pass
    return inner
";
        let chunks = extract_chunks(source, Lang::Python, "a.py");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("outer"));
        assert_eq!(chunks[1].name.as_deref(), Some("inner"));
        assert!(chunks[0].content.contains("def inner"));
    }

    #[test]
    fn start_lines_are_one_based() {
        let source = "x = 1\n\ndef later():\n    pass\n";
        let chunks = extract_chunks(source, Lang::Python, "a.py");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 3);
    }

    #[test]
    fn chunk_content_is_exact_node_text() {
        let source = "def f(a, b):\n    return a + b\n";
        let chunks = extract_chunks(source, Lang::Python, "a.py");
        assert_eq!(chunks[0].content, "def f(a, b):\n    return a + b");
    }

    #[test]
    fn traversal_order_is_pre_order() {
        let source = "\
class First:
    def method_a(self): pass
    def method_b(self): pass

def second(): pass
";
        let chunks = extract_chunks(source, Lang::Python, "a.py");
        let names: Vec<_> = chunks.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["First", "method_a", "method_b", "second"]);
    }

    #[test]
    fn file_without_definitions_yields_nothing() {
        let chunks = extract_chunks("x = 1\nprint(x)\n", Lang::Python, "a.py");
        assert!(chunks.is_empty());
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(extract_chunks("", Lang::Python, "a.py").is_empty());
    }

    #[test]
    fn broken_source_does_not_panic() {
        // tree-sitter error-recovers, so this may or may not produce chunks;
        // it must not panic.
        let _ = extract_chunks("def broken(:\n  ???", Lang::Python, "a.py");
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn rust_items_are_chunked() {
        let source = "\
pub struct Point {
    x: f32,
}

fn origin() -> Point {
    Point { x: 0.0 }
}
";
        let chunks = extract_chunks(source, Lang::Rust, "lib.rs");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("Point"));
        assert_eq!(chunks[0].kind, ChunkKind::Class);
        assert_eq!(chunks[1].name.as_deref(), Some("origin"));
        assert_eq!(chunks[1].kind, ChunkKind::Function);
    }

    #[cfg(feature = "lang-js")]
    #[test]
    fn javascript_methods_are_functions() {
        let source = "\
class Widget {
  render() { return null; }
}

function helper() {}
";
        let chunks = extract_chunks(source, Lang::JavaScript, "widget.js");
        let kinds: Vec<_> = chunks.iter().map(|c| (c.kind, c.name.as_deref())).collect();
        assert_eq!(
            kinds,
            vec![
                (ChunkKind::Class, Some("Widget")),
                (ChunkKind::Function, Some("render")),
                (ChunkKind::Function, Some("helper")),
            ]
        );
    }
}
