use serde::{Deserialize, Serialize};
use std::fmt;

/// Human-readable text with placeholders, ready for a translation layer.
///
/// Placeholders start with `@` (plain) or `%` (emphasised). Rendering through
/// [`fmt::Display`] substitutes the arguments into the template; the requested
/// language code is only carried along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    langcode: Option<String>,
}

impl Text {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            args: Vec::new(),
            langcode: None,
        }
    }

    /// Add a placeholder argument, e.g. `arg("@number", 12)`.
    pub fn arg(mut self, placeholder: impl Into<String>, value: impl fmt::Display) -> Self {
        self.args.push((placeholder.into(), value.to_string()));
        self
    }

    pub fn langcode(mut self, langcode: Option<&str>) -> Self {
        self.langcode = langcode.map(str::to_string);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    pub fn requested_langcode(&self) -> Option<&str> {
        self.langcode.as_deref()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Longest placeholders first so "@count" never eats "@count_total".
        let mut args: Vec<&(String, String)> = self.args.iter().collect();
        args.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut rendered = self.template.clone();
        for (placeholder, value) in args {
            let replacement = if placeholder.starts_with('%') {
                format!("<em>{}</em>", value)
            } else {
                value.clone()
            };
            rendered = rendered.replace(placeholder.as_str(), &replacement);
        }
        f.write_str(&rendered)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::new(s)
    }
}
