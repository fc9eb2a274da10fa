//! Prompt templates loaded from a directory of `.txt` files.

use std::path::{Path, PathBuf};

/// Template used when the caller names none.
pub const DEFAULT_TEMPLATE_NAME: &str = "code_qa_template";

/// Stand-in template when the named file is missing or unreadable.
const FALLBACK_TEMPLATE: &str =
    "You are a helpful AI assistant.\n\nContext:\n{context}\n\nQuestion:\n{question}";

/// System prompt when the template's first line is not usable as one.
const FALLBACK_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A rendered prompt ready to send upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Name and location of one available template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInfo {
    pub name: String,
    pub path: PathBuf,
}

/// Directory-backed template source.
///
/// Loading never fails: a missing or unreadable template degrades to a
/// built-in fallback with a warning, so a typo in a template name still
/// produces an answer.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Raw template text for `name` (`<dir>/<name>.txt`).
    #[must_use]
    pub fn load(&self, name: &str) -> String {
        let path = self.dir.join(format!("{name}.txt"));
        match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    "template {name} not readable at {}: {err}, using fallback",
                    path.display()
                );
                FALLBACK_TEMPLATE.to_string()
            }
        }
    }

    /// Render the named template with retrieval context and the question.
    #[must_use]
    pub fn render(&self, name: &str, context: &str, question: &str) -> Prompt {
        render_template(&self.load(name), context, question)
    }

    /// All `.txt` templates in the directory, sorted by name. A missing
    /// directory lists as empty.
    #[must_use]
    pub fn list(&self) -> Vec<TemplateInfo> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut templates: Vec<TemplateInfo> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let name = path
                    .file_name()?
                    .to_str()?
                    .strip_suffix(".txt")?
                    .to_string();
                Some(TemplateInfo { name, path })
            })
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }
}

/// Substitute `{context}` and `{question}`, and derive the system prompt
/// from the template's first line. A first line that itself starts with a
/// placeholder brace cannot serve as a system prompt, so a generic one is
/// used instead.
fn render_template(template: &str, context: &str, question: &str) -> Prompt {
    let user = template
        .replace("{context}", context)
        .replace("{question}", question);
    let first_line = template.lines().next().unwrap_or("");
    let system = if first_line.starts_with('{') || first_line.is_empty() {
        FALLBACK_SYSTEM_PROMPT
    } else {
        first_line
    };
    Prompt {
        system: system.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn store_with(name: &str, content: &str) -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(format!("{name}.txt")), content).unwrap();
        let store = TemplateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn load_reads_template_file() {
        let (_dir, store) = store_with("code_qa_template", "Be terse.\n\n{context}\n{question}");
        assert_eq!(store.load("code_qa_template"), "Be terse.\n\n{context}\n{question}");
    }

    #[test]
    fn missing_template_falls_back() {
        let store = TemplateStore::new("/no/such/dir");
        let content = store.load("anything");
        assert!(content.contains("{context}"));
        assert!(content.contains("{question}"));
        assert!(content.starts_with("You are a helpful AI assistant."));
    }

    #[test]
    fn render_substitutes_placeholders() {
        let (_dir, store) = store_with("t", "Answer well.\n\nContext:\n{context}\n\nQ: {question}");
        let prompt = store.render("t", "some code", "what is it?");
        assert_eq!(prompt.user, "Answer well.\n\nContext:\nsome code\n\nQ: what is it?");
        assert_eq!(prompt.system, "Answer well.");
    }

    #[test]
    fn system_prompt_is_first_line() {
        let prompt = render_template("You are a code expert.\n{context}\n{question}", "c", "q");
        assert_eq!(prompt.system, "You are a code expert.");
    }

    #[test]
    fn brace_first_line_gets_generic_system_prompt() {
        let prompt = render_template("{context}\n\nQuestion: {question}", "ctx", "q");
        assert_eq!(prompt.system, "You are a helpful assistant.");
        assert_eq!(prompt.user, "ctx\n\nQuestion: q");
    }

    #[test]
    fn empty_template_gets_generic_system_prompt() {
        let prompt = render_template("", "c", "q");
        assert_eq!(prompt.system, "You are a helpful assistant.");
    }

    #[test]
    fn repeated_placeholders_all_substituted() {
        let prompt = render_template("Sys\n{question} and again {question}", "c", "why");
        assert_eq!(prompt.user, "Sys\nwhy and again why");
    }

    #[test]
    fn list_finds_txt_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("zeta.txt"), "z").unwrap();
        fs::write(dir.path().join("alpha.txt"), "a").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let store = TemplateStore::new(dir.path());

        let names: Vec<_> = store.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn list_missing_directory_is_empty() {
        let store = TemplateStore::new("/no/such/dir");
        assert!(store.list().is_empty());
    }
}
