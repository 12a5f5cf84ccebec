//! Message rendering with minijinja

use std::path::{Path, PathBuf};

use minijinja::value::Rest;
use minijinja::{context, Environment, ErrorKind};
use regex::Regex;

use crate::alerts::WebhookMessage;
use crate::watchdog::{EventKind, WatchdogEvent};

/// Template for a relayed webhook message
pub const ALERT_TEMPLATE: &str = "alert";
/// Template for a watchdog that went silent
pub const FIRE_TEMPLATE: &str = "watchdog_fire";
/// Template for a watchdog that resumed pinging
pub const RECOVER_TEMPLATE: &str = "watchdog_recover";

const DEFAULTS: [(&str, &str); 3] = [
    (ALERT_TEMPLATE, include_str!("templates/alert.j2")),
    (FIRE_TEMPLATE, include_str!("templates/watchdog_fire.j2")),
    (RECOVER_TEMPLATE, include_str!("templates/watchdog_recover.j2")),
];

/// File extension of template overrides
const TEMPLATE_EXT: &str = "j2";

/// Named message templates
pub struct TemplateService {
    env: Environment<'static>,
}

impl TemplateService {
    /// Templates built into the binary
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();

        env.add_filter("match", re_match);
        env.add_filter("re_replace_all", re_replace_all);
        env.add_function("string_slice", string_slice);

        for (name, source) in DEFAULTS {
            env.add_template(name, source)?;
        }

        Ok(Self { env })
    }

    /// Built-in templates, overridden by any `<name>.j2` file found in `dir`
    pub fn with_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut service = Self::new()?;

        for (name, _) in DEFAULTS {
            let path = dir.join(format!("{name}.{TEMPLATE_EXT}"));
            if !path.is_file() {
                continue;
            }

            let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            service.env.add_template_owned(name, source)?;
            tracing::info!(template = name, path = %path.display(), "Loaded template override");
        }

        Ok(service)
    }

    /// Render a whole webhook message
    pub fn render_message(&self, message: &WebhookMessage) -> Result<String, TemplateError> {
        let tmpl = self.env.get_template(ALERT_TEMPLATE)?;
        Ok(tmpl.render(message)?)
    }

    /// Render a watchdog transition
    pub fn render_event(&self, event: &WatchdogEvent) -> Result<String, TemplateError> {
        let name = match event.kind {
            EventKind::Fired => FIRE_TEMPLATE,
            EventKind::Recovered => RECOVER_TEMPLATE,
        };

        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(context! {
            id => &event.id,
            kind => event.kind,
            alert => &event.alert,
        })?)
    }
}

/// Template errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Render(#[from] minijinja::Error),

    #[error("Failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn compile(pattern: &str) -> Result<Regex, minijinja::Error> {
    Regex::new(pattern).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid regex {pattern:?}: {e}"),
        )
    })
}

/// `{{ text | match("^prod") }}`
fn re_match(value: String, pattern: String) -> Result<bool, minijinja::Error> {
    Ok(compile(&pattern)?.is_match(&value))
}

/// `{{ text | re_replace_all("-+", "_") }}`
fn re_replace_all(
    value: String,
    pattern: String,
    replacement: String,
) -> Result<String, minijinja::Error> {
    Ok(compile(&pattern)?
        .replace_all(&value, replacement.as_str())
        .into_owned())
}

/// `{{ string_slice("a", "b") | join(",") }}`
fn string_slice(values: Rest<String>) -> Vec<String> {
    values.0
}
