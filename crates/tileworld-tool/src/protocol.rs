//! Script and report formats for the tileworld tool.

use serde::{Deserialize, Serialize};
use tileworld_core::{DraftPayload, EditEvent, SessionConfig};

/// An edit script: either a bare list of actions or an object with a config.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Script {
    Actions(Vec<serde_json::Value>),
    WithConfig {
        #[serde(default)]
        config: Option<SessionConfig>,
        actions: Vec<serde_json::Value>,
    },
}

impl Script {
    pub fn config(&self) -> Option<SessionConfig> {
        match self {
            Script::Actions(_) => None,
            Script::WithConfig { config, .. } => *config,
        }
    }

    pub fn into_actions(self) -> Vec<serde_json::Value> {
        match self {
            Script::Actions(actions) | Script::WithConfig { actions, .. } => actions,
        }
    }
}

/// One line of the tool's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ReportLine {
    /// The world was loaded and canonicalized
    Loaded {
        width: u32,
        height: u32,
        settlements: usize,
    },

    /// An action was applied
    Applied {
        index: usize,
        events: Vec<EditEvent>,
    },

    /// An action was denied or could not be parsed
    Rejected {
        index: usize,
        reason: String,
        message: String,
    },

    /// Everything staged by the script
    Draft { payload: DraftPayload },
}
