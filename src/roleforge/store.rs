// Purpose: The read-only template store. Populated once before resolution
// starts, then only read; the resolution path has no mutation API.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use walkdir::WalkDir;

use super::builtin::BUILTIN_TEMPLATES;
use super::error::TemplateError;
use super::template::Template;

#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: IndexMap<String, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            templates: IndexMap::new(),
        }
    }

    pub fn with_builtins() -> Result<Self> {
        let mut store = Self::new();
        for src in BUILTIN_TEMPLATES {
            let template: Template = serde_json::from_str(src)?;
            store.add(template)?;
        }
        Ok(store)
    }

    // Verifies and inserts a template; a second template for the same stack
    // is an authoring error.
    pub fn add(&mut self, template: Template) -> Result<(), TemplateError> {
        template.verify()?;
        if self.templates.contains_key(&template.stack) {
            return Err(TemplateError::DuplicateStack {
                stack: template.stack,
            });
        }
        self.templates.insert(template.stack.clone(), template);
        Ok(())
    }

    // Loads every *.json under dir. A stack already known to the store is
    // replaced, so user template dirs can shadow builtins; two templates for
    // the same stack within one dir are rejected.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        let mut seen: Vec<String> = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let src = std::fs::read_to_string(entry.path())
                .with_context(|| format!("reading template {}", entry.path().display()))?;
            let template: Template = serde_json::from_str(&src)
                .with_context(|| format!("parsing template {}", entry.path().display()))?;
            template
                .verify()
                .with_context(|| format!("template {}", entry.path().display()))?;

            if seen.contains(&template.stack) {
                return Err(TemplateError::DuplicateStack {
                    stack: template.stack,
                }
                .into());
            }
            seen.push(template.stack.clone());

            if self.templates.contains_key(&template.stack) {
                debug!(
                    "template {} shadows stack {}",
                    entry.path().display(),
                    template.stack
                );
            }
            self.templates.insert(template.stack.clone(), template);
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn lookup(&self, stack: &str) -> Option<&Template> {
        self.templates.get(stack)
    }

    pub fn stacks(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}
