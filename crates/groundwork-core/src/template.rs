//! Template expansion
//!
//! Expands `{{ NAME }}` occurrences in KDL files with tera before parsing.
//! Variables come from the root file's `variables` block and an optional
//! `.env` file.

use crate::error::{CoreError, Result};
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// Estimated bytes per file, for capacity preallocation
const ESTIMATED_BYTES_PER_FILE: usize = 500;

/// Variable context
pub type Variables = HashMap<String, serde_json::Value>;

/// Template processor
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// Add a single variable
    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    /// Add a batch of variables
    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// Load variables from a `.env` file
    ///
    /// `.env` variables are loaded without prefix filtering since the file is
    /// placed explicitly by the user.
    #[tracing::instrument(skip(self))]
    pub fn add_env_file_variables(&mut self, env_file_path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(env_file_path).map_err(|e| CoreError::IoPath {
            path: env_file_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = strip_quotes(value.trim());
                debug!(key = %key, "Adding variable from .env file");
                self.context
                    .insert(key, &serde_json::Value::String(value.to_string()));
                count += 1;
            }
        }

        info!(
            env_file = %env_file_path.display(),
            variable_count = count,
            "Loaded variables from .env file"
        );
        Ok(())
    }

    /// Render a string as a template
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera.render_str(template, &self.context).map_err(|e| {
            CoreError::TemplateRenderError(extract_tera_error_detail(&e))
        })
    }

    /// Read a file and render it
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoPath {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| {
            if let CoreError::TemplateRenderError(msg) = e {
                CoreError::TemplateError {
                    file: path.to_path_buf(),
                    message: msg,
                }
            } else {
                e
            }
        })
    }

    /// Render several files in order and concatenate the results
    pub fn render_files(&mut self, paths: &[impl AsRef<Path>]) -> Result<String> {
        let mut result = String::with_capacity(paths.len() * ESTIMATED_BYTES_PER_FILE);
        for path in paths {
            let rendered = self.render_file(path.as_ref())?;
            result.push_str(&rendered);
            result.push('\n');
        }
        Ok(result)
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `variables { ... }` blocks from raw KDL content
///
/// Uses a regex rather than a full KDL parse so that `{{ ... }}` template
/// markers elsewhere in the document cannot break extraction.
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    use regex::Regex;

    let re = Regex::new(r"(?s)variables\s*\{(?P<content>.*?)\}")
        .map_err(|e| CoreError::InvalidConfig(format!("regex compile error: {e}")))?;

    let mut all_vars = HashMap::new();

    for cap in re.captures_iter(kdl_content) {
        if let Some(var_content) = cap.name("content") {
            // Parse just the block body as a stand-alone KDL fragment
            let dummy_kdl = format!("extracted {{\n{}\n}}", var_content.as_str());
            let doc: kdl::KdlDocument = dummy_kdl.parse().map_err(|e| {
                CoreError::InvalidConfig(format!("KDL parse error (variables block): {e}"))
            })?;

            if let Some(node) = doc.nodes().first()
                && let Some(children) = node.children()
            {
                for var_node in children.nodes() {
                    let key = var_node.name().value().to_string();
                    if let Some(entry) = var_node.entries().first() {
                        all_vars.insert(key, kdl_value_to_json(entry.value()));
                    }
                }
            }
        }
    }

    Ok(all_vars)
}

/// Strip surrounding quotes: `"value"` or `'value'` → `value`
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Pull variable names out of tera's error chain
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }
    let full_error = details.join(" | ");

    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "undefined variable `{var_name}`\nhint: define it in a variables block or in .env"
        );
    }

    full_error
}

/// Convert a KDL value into a JSON value
fn kdl_value_to_json(value: &kdl::KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::Number((i as i64).into())
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_variable_expansion() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable("REGION", serde_json::Value::String("ap-east-1".to_string()));

        let result = processor.render_str(r#"region "{{ REGION }}""#).unwrap();
        assert_eq!(result, r#"region "ap-east-1""#);
    }

    #[test]
    fn test_undefined_variable_error_names_variable() {
        let mut processor = TemplateProcessor::new();
        let err = processor.render_str("{{ missing_var }}").unwrap_err();
        assert!(err.to_string().contains("missing_var"));
    }

    #[test]
    fn test_extract_variables() {
        let kdl = r#"
variables {
    BASE_CIDR "10.0.0.0/16"
    INSTANCE_COUNT 3
    MONITORING #true
}
"#;
        let vars = extract_variables(kdl).unwrap();
        assert_eq!(vars.get("BASE_CIDR").unwrap(), "10.0.0.0/16");
        assert_eq!(vars.get("INSTANCE_COUNT").unwrap(), 3);
        assert_eq!(vars.get("MONITORING").unwrap(), true);
    }

    #[test]
    fn test_extract_variables_last_block_wins() {
        let kdl = r#"
variables {
    NAME "first"
}

resource "network" "core" {}

variables {
    NAME "second"
}
"#;
        let vars = extract_variables(kdl).unwrap();
        assert_eq!(vars.get("NAME").unwrap(), "second");
    }

    #[test]
    fn test_env_file_variables() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env_file = temp_dir.path().join(".env");
        std::fs::write(
            &env_file,
            r#"
# comment
REGION=ap-east-1
BASE_DOMAIN="example.test"
QUOTED_SINGLE='single quoted'

API_TOKEN=secret-123
"#,
        )
        .unwrap();

        let mut processor = TemplateProcessor::new();
        processor.add_env_file_variables(&env_file).unwrap();

        assert_eq!(processor.render_str("{{ REGION }}").unwrap(), "ap-east-1");
        assert_eq!(
            processor.render_str("{{ BASE_DOMAIN }}").unwrap(),
            "example.test"
        );
        assert_eq!(
            processor.render_str("{{ QUOTED_SINGLE }}").unwrap(),
            "single quoted"
        );
        assert_eq!(processor.render_str("{{ API_TOKEN }}").unwrap(), "secret-123");
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("'hello'"), "hello");
        assert_eq!(strip_quotes("hello"), "hello");
        assert_eq!(strip_quotes("\"hello"), "\"hello");
        assert_eq!(strip_quotes(""), "");
    }

    #[test]
    fn test_template_loop_over_list() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable(
            "zones",
            serde_json::json!(["ap-east-1a", "ap-east-1b"]),
        );

        let template = r#"
{% for zone in zones %}
resource "subnet" "{{ zone }}" {}
{% endfor %}
"#;
        let result = processor.render_str(template).unwrap();
        assert!(result.contains(r#"resource "subnet" "ap-east-1a""#));
        assert!(result.contains(r#"resource "subnet" "ap-east-1b""#));
    }
}
