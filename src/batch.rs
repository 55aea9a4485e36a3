//! Batch construction
//!
//! Turns the loaded logins into report tasks. Each login gets its own request:
//! the header template is rendered with the login and its token, the body
//! template with the report period (yesterday, for both ends) and a random
//! report name. Rendered headers must form a JSON object of strings.

use crate::config::PathsConfig;
use crate::db::LoginCredentials;
use crate::error::{Error, Result};
use crate::task::{ReportRequest, ReportTask, TaskHandle};
use crate::template::{
    AUTHORIZATION_TOKEN, CLIENT_LOGIN, DATE_FROM, DATE_TO, REPORT_NAME, Template,
};
use chrono::{Local, NaiveDate};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds report tasks from logins and request templates
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    header: Template,
    body: Template,
    report_date: NaiveDate,
}

impl BatchBuilder {
    /// Create a builder reporting on yesterday
    pub fn new(header: Template, body: Template) -> Self {
        Self {
            header,
            body,
            report_date: yesterday(),
        }
    }

    /// Load both templates from the configured paths
    pub fn from_paths(paths: &PathsConfig) -> Result<Self> {
        let header = Template::from_file(&paths.header_template)?;
        let body = Template::from_file(&paths.body_template)?;
        Ok(Self::new(header, body))
    }

    /// Report on a specific day instead of yesterday
    pub fn with_report_date(mut self, date: NaiveDate) -> Self {
        self.report_date = date;
        self
    }

    /// Day the batch reports on
    pub fn report_date(&self) -> NaiveDate {
        self.report_date
    }

    /// Render the request for one login
    pub fn request_for(&self, credentials: &LoginCredentials) -> Result<ReportRequest> {
        let header_text = self.header.render([
            (AUTHORIZATION_TOKEN, credentials.token.as_str()),
            (CLIENT_LOGIN, credentials.login.as_str()),
        ]);

        let date = self.report_date.format(DATE_FORMAT).to_string();
        let report_name = report_name().to_string();
        let body = self.body.render([
            (DATE_FROM, date.as_str()),
            (DATE_TO, date.as_str()),
            (REPORT_NAME, report_name.as_str()),
        ]);

        Ok(ReportRequest {
            headers: parse_headers(&header_text)?,
            body,
        })
    }

    /// Build one task per login
    pub fn build(&self, logins: &[LoginCredentials]) -> Result<Vec<TaskHandle>> {
        let tasks = logins
            .iter()
            .map(|credentials| {
                let request = self.request_for(credentials)?;
                Ok(ReportTask::handle(credentials.login.clone(), request))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            tasks = tasks.len(),
            report_date = %self.report_date,
            "report batch built"
        );
        Ok(tasks)
    }
}

/// Yesterday in local time
pub fn yesterday() -> NaiveDate {
    (Local::now() - chrono::Duration::hours(24)).date_naive()
}

/// Random non-negative 63-bit report name
fn report_name() -> i64 {
    rand::thread_rng().gen_range(0..=i64::MAX)
}

fn parse_headers(text: &str) -> Result<HeaderMap> {
    let key = "paths.header_template";
    let pairs: HashMap<String, String> = serde_json::from_str(text).map_err(|e| {
        Error::config(
            format!("header template must render to a JSON object of strings: {}", e),
            key,
        )
    })?;

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::config(format!("invalid header name {:?}: {}", name, e), key))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            Error::config(format!("invalid value for header {:?}: {}", name, e), key)
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
