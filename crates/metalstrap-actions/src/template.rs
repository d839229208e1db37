//! Strict rendering of configuration documents and post-install scripts
//!
//! Templates use Jinja syntax (`{{ hostname }}`). Referencing a parameter
//! that is not set is an error rather than an empty string.

use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

use crate::error::{ActionError, Result};
use crate::target::Target;

/// Parameters every template can reference
#[derive(Clone, Serialize)]
pub struct TemplateParams {
    pub hostname: String,
    pub ip: String,
    pub login: String,
    /// Unset until the rescue system has been activated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub discovery_token: String,
    pub public_keys: String,
    pub drive: String,
    pub channel: String,
}

impl TemplateParams {
    /// Parameters describing `target` at this point of its pipeline
    pub fn for_target(target: &Target, discovery_token: &str) -> Self {
        Self {
            hostname: target.config.hostname.clone(),
            ip: target.config.ip.clone(),
            login: target.login.clone(),
            password: target.password.clone(),
            discovery_token: discovery_token.to_string(),
            public_keys: target.config.public_keys.clone(),
            drive: target.config.drive.clone(),
            channel: target.config.channel.clone(),
        }
    }
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
}

/// Render `source` against `params`
///
/// `name` only labels errors.
pub fn render(name: &str, source: &str, params: &TemplateParams) -> Result<String> {
    environment()
        .render_str(source, params)
        .map_err(|source| ActionError::Template {
            name: name.to_string(),
            source,
        })
}

/// Check that `source` parses, without rendering it
pub fn check_syntax(name: &str, source: &str) -> Result<()> {
    let env = environment();
    env.template_from_str(source)
        .map(|_| ())
        .map_err(|source| ActionError::Template {
            name: name.to_string(),
            source,
        })
}
