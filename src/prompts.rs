use std::path::PathBuf;

use anyhow::{Context, Result};

/// Opening script used when the named template cannot be found.
pub const DEFAULT_PROMPT: &str = "Hi, this is Alex from Luma. Quick question: are you \
happy with how many qualified leads you're getting each month?";

/// Context available to a call script template.
#[derive(Debug, Default, Clone)]
pub struct PromptContext {
    pub company: Option<String>,
    pub contact: Option<String>,
    pub phone: Option<String>,
}

/// Source of named call script templates. The campaign core only reads
/// templates; authoring and storage live elsewhere.
pub trait PromptStore: Send + Sync + 'static {
    /// Returns the raw template text, or `None` when no template with that
    /// name exists.
    fn load(&self, name: &str) -> Result<Option<String>>;
}

/// Reads templates from `<dir>/<name>.txt`.
pub struct FilePromptStore {
    dir: PathBuf,
}

impl FilePromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PromptStore for FilePromptStore {
    fn load(&self, name: &str) -> Result<Option<String>> {
        // Template names come from lead rows; refuse anything that could
        // escape the prompt directory.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Ok(None);
        }

        let path = self.dir.join(format!("{name}.txt"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read prompt {}", path.display()))
            }
        }
    }
}

/// Resolves a named template and substitutes `${company}`, `${contact}` and
/// `${phone}` placeholders. A missing template falls back to the default
/// script; unknown placeholders are left untouched.
pub fn render_prompt(store: &dyn PromptStore, name: &str, context: &PromptContext) -> String {
    let template = match store.load(name) {
        Ok(Some(text)) => text,
        Ok(None) => {
            tracing::debug!(prompt = name, "prompt template missing, using default");
            DEFAULT_PROMPT.to_string()
        }
        Err(err) => {
            tracing::warn!(prompt = name, error = %err, "prompt store error, using default");
            DEFAULT_PROMPT.to_string()
        }
    };

    substitute(&template, context)
}

fn substitute(template: &str, context: &PromptContext) -> String {
    let company = context.company.as_deref().unwrap_or("your company");
    let contact = context.contact.as_deref().unwrap_or("there");
    let phone = context.phone.as_deref().unwrap_or("");

    template
        .replace("${company}", company)
        .replace("${contact}", contact)
        .replace("${phone}", phone)
}
