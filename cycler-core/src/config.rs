//! Loop configuration.
//!
//! A [`LoopConfig`] carries the knobs that do not depend on the owner's
//! types: a label for logs and thread names, which serial context to confine
//! mutation to, and whether every reduced input is logged.

use serde::Deserialize;

use crate::error::{LoopError, Result};

/// Which serial execution context a loop is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// The host's UI thread, represented by a [`MainContext`](crate::MainContext).
    #[default]
    Main,

    /// A dedicated worker thread owned by the loop.
    Worker,
}

/// Configuration for a [`FeedbackLoop`](crate::FeedbackLoop).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Name used in log fields and as the worker thread name.
    pub label: String,

    /// The serial context mutation is confined to.
    pub context: ContextMode,

    /// Log every reduced input at `debug` level.
    pub trace_inputs: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            label: "FeedbackLoop".to_string(),
            context: ContextMode::Main,
            trace_inputs: false,
        }
    }
}

impl LoopConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the label can name a thread.
    pub fn validate(&self) -> Result<()> {
        if self.label.contains('\0') {
            return Err(LoopError::InvalidName(self.label.clone()));
        }
        Ok(())
    }

    /// Name for a worker thread spawned under this configuration.
    pub(crate) fn thread_name(&self) -> String {
        format!("cycler-{}", self.label)
    }
}
