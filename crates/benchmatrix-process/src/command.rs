//! Command templates.
//!
//! A template is an argv whose elements may contain placeholders:
//!
//! | placeholder  | value                                        |
//! |--------------|----------------------------------------------|
//! | `{bench}`    | bench id                                     |
//! | `{source}`   | bench source path                            |
//! | `{library}`  | library the bench was discovered in          |
//! | `{config}`   | parameter set name                           |
//! | `{generics}` | one `KEY=VALUE` element per binding, by key  |
//! | `{sources}`  | one element per registered source file       |
//!
//! A list placeholder standing alone expands to several argv elements;
//! embedded in a larger element it is joined with spaces. Other brace
//! sequences are passed through untouched.

use benchmatrix_core::{Bench, Bindings, SourceCatalog};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, ProcessResult};

const SCALARS: [&str; 4] = ["bench", "source", "library", "config"];
const LISTS: [&str; 2] = ["generics", "sources"];

/// Values available to a template expansion.
#[derive(Debug, Default, Clone)]
pub struct TemplateContext {
    bench: Option<String>,
    source: Option<String>,
    library: Option<String>,
    config: Option<String>,
    generics: Option<Vec<String>>,
    sources: Option<Vec<String>>,
}

impl TemplateContext {
    /// Context for one run unit.
    pub fn for_unit(bench: &Bench, config_name: &str, bindings: &Bindings) -> Self {
        Self {
            bench: Some(bench.id.clone()),
            source: Some(bench.source_ref.display().to_string()),
            library: Some(bench.library.clone()),
            config: Some(config_name.to_string()),
            generics: Some(
                bindings
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect(),
            ),
            sources: None,
        }
    }

    /// Context for the one-time compile step.
    pub fn for_sources(catalog: &SourceCatalog) -> Self {
        Self {
            sources: Some(
                catalog
                    .all_files()
                    .map(|path| path.display().to_string())
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn scalar(&self, name: &str) -> Option<&String> {
        match name {
            "bench" => self.bench.as_ref(),
            "source" => self.source.as_ref(),
            "library" => self.library.as_ref(),
            "config" => self.config.as_ref(),
            _ => None,
        }
    }

    fn list(&self, name: &str) -> Option<&Vec<String>> {
        match name {
            "generics" => self.generics.as_ref(),
            "sources" => self.sources.as_ref(),
            _ => None,
        }
    }
}

/// An argv with placeholders. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl TryFrom<Vec<String>> for CommandTemplate {
    type Error = ProcessError;

    fn try_from(argv: Vec<String>) -> ProcessResult<Self> {
        Self::from_argv(argv)
    }
}

impl From<CommandTemplate> for Vec<String> {
    fn from(template: CommandTemplate) -> Self {
        template.argv
    }
}

impl CommandTemplate {
    pub fn from_argv(argv: Vec<String>) -> ProcessResult<Self> {
        if argv.is_empty() || argv[0].trim().is_empty() {
            return Err(ProcessError::EmptyCommand);
        }
        Ok(Self { argv })
    }

    /// Split `command` on whitespace. No shell quoting is interpreted.
    pub fn parse(command: &str) -> ProcessResult<Self> {
        Self::from_argv(command.split_whitespace().map(str::to_string).collect())
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Substitute placeholders from `ctx`.
    ///
    /// A known placeholder without a value in `ctx` is an error.
    pub fn expand(&self, ctx: &TemplateContext) -> ProcessResult<Vec<String>> {
        let mut out = Vec::with_capacity(self.argv.len());
        for element in &self.argv {
            if let Some(name) = standalone_list(element) {
                let values = ctx.list(name).ok_or_else(|| unbound(name))?;
                out.extend(values.iter().cloned());
                continue;
            }
            out.push(substitute(element, ctx)?);
        }
        Ok(out)
    }
}

fn standalone_list(element: &str) -> Option<&str> {
    let name = element.strip_prefix('{')?.strip_suffix('}')?;
    LISTS.contains(&name).then_some(name)
}

fn substitute(element: &str, ctx: &TemplateContext) -> ProcessResult<String> {
    let mut result = element.to_string();
    for name in SCALARS {
        let token = format!("{{{name}}}");
        if result.contains(&token) {
            let value = ctx.scalar(name).ok_or_else(|| unbound(name))?;
            result = result.replace(&token, value);
        }
    }
    for name in LISTS {
        let token = format!("{{{name}}}");
        if result.contains(&token) {
            let values = ctx.list(name).ok_or_else(|| unbound(name))?;
            result = result.replace(&token, &values.join(" "));
        }
    }
    Ok(result)
}

fn unbound(name: &str) -> ProcessError {
    ProcessError::UnboundPlaceholder {
        placeholder: name.to_string(),
    }
}
