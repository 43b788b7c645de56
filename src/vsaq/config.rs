// SPDX-License-Identifier: MIT

//! Runtime configuration read from the environment (and `.env`)

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::error::QuestionnaireError;
use crate::vsaq::questionnaire::{DisplayMode, DEFAULT_DEBOUNCE};

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delay before a free-text change triggers a visibility pass
    pub debounce: Duration,
    /// Directory served by the HTTP surface
    pub template_dir: PathBuf,
    pub port: u16,
    pub mode: DisplayMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            port: DEFAULT_PORT,
            mode: DisplayMode::default(),
        }
    }
}

impl Config {
    /// Read `VSAQ_*` variables from the process environment
    pub fn from_env() -> Result<Self, QuestionnaireError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, QuestionnaireError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = lookup("VSAQ_DEBOUNCE_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| QuestionnaireError::config(format!("VSAQ_DEBOUNCE_MS={}", ms)))?;
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(dir) = lookup("VSAQ_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("VSAQ_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| QuestionnaireError::config(format!("VSAQ_PORT={}", port)))?;
        }

        config.mode = DisplayMode {
            admin: flag(&lookup, "VSAQ_ADMIN")?,
            readonly: flag(&lookup, "VSAQ_READONLY")?,
            unrolled: flag(&lookup, "VSAQ_UNROLLED")?,
        };
        Ok(config)
    }
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool, QuestionnaireError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(QuestionnaireError::config(format!("{}={}", key, value))),
        },
    }
}
