//! Placeholder templates for request headers and bodies
//!
//! A template is plain text with `@Name` placeholders. Rendering replaces every
//! occurrence of each placeholder with its value; unknown placeholders are left
//! untouched.

use crate::error::{Error, Result};
use std::path::Path;

/// Placeholder for the integration's authorization token
pub const AUTHORIZATION_TOKEN: &str = "@AuthorizationToken";
/// Placeholder for the client login
pub const CLIENT_LOGIN: &str = "@Client-Login";
/// Placeholder for the first day of the report period
pub const DATE_FROM: &str = "@DateFrom";
/// Placeholder for the last day of the report period
pub const DATE_TO: &str = "@DateTo";
/// Placeholder for the per-request report name
pub const REPORT_NAME: &str = "@ReportName";

/// A loaded text template
#[derive(Debug, Clone, Default)]
pub struct Template {
    text: String,
}

impl Template {
    /// Build a template from text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a template from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Template {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { text })
    }

    /// Render the template with `(placeholder, value)` pairs
    ///
    /// Pairs are applied in order. An empty template renders to an empty string.
    pub fn render<'a, I>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        if self.text.is_empty() {
            return String::new();
        }
        params
            .into_iter()
            .fold(self.text.clone(), |text, (key, value)| text.replace(key, value))
    }
}
