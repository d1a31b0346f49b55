use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::screen_def::ScreenDefinitionConfig;

/// Text limits applied when rendering diagrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramOptions {
    /// Flow-chart screen names are cut to this length minus three, before
    /// the ellipsis.
    pub screen_name_line_length: usize,
    pub trigger_text_limit: usize,
    /// Display-width columns per line of a sequence-diagram note.
    pub note_wrap_width: usize,
    pub message_text_limit: usize,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            screen_name_line_length: 30,
            trigger_text_limit: 20,
            note_wrap_width: 16,
            message_text_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub screen_definition: ScreenDefinitionConfig,
    pub diagram: DiagramOptions,
}

/// `~/.exploview/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".exploview")
        .join("config.json")
}

impl Settings {
    /// Load settings from `path`, or from the default location when `None`.
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = default_config_path();
                if !p.exists() {
                    debug!(path = %p.display(), "no config file, using defaults");
                    return Ok(Self::default());
                }
                p
            }
        };

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(
            path = %path.display(),
            screen_rules = settings.screen_definition.conditions.len(),
            "config loaded"
        );
        Ok(settings)
    }

    pub fn has_screen_rules(&self) -> bool {
        !self.screen_definition.conditions.is_empty()
    }
}
