//! Runs edit scripts against an editing session.

use thiserror::Error;
use tileworld_core::{EditAction, EditError, EditEvent, EditorSession};
use tracing::{debug, warn};

use crate::protocol::ReportLine;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl RunnerError {
    pub fn reason(&self) -> &'static str {
        match self {
            RunnerError::InvalidAction(_) => "invalid_action",
            RunnerError::Edit(e) => e.reason(),
        }
    }
}

/// A session driven by JSON actions.
pub struct ScriptRunner {
    session: EditorSession,
}

impl ScriptRunner {
    pub fn new(session: EditorSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Report describing the loaded world
    pub fn loaded(&self) -> ReportLine {
        let world = self.session.world();
        ReportLine::Loaded {
            width: world.width(),
            height: world.height(),
            settlements: world.settlements().len(),
        }
    }

    pub fn apply_action(&mut self, action: serde_json::Value) -> Result<Vec<EditEvent>, RunnerError> {
        // Parse and apply action
        let action: EditAction = serde_json::from_value(action)
            .map_err(|e| RunnerError::InvalidAction(e.to_string()))?;
        debug!(?action, "applying action");
        Ok(self.session.apply_action(action)?)
    }

    /// Apply one action and describe the outcome
    pub fn step(&mut self, index: usize, action: serde_json::Value) -> ReportLine {
        match self.apply_action(action) {
            Ok(events) => ReportLine::Applied { index, events },
            Err(e) => {
                warn!(index, reason = e.reason(), "action rejected: {}", e);
                ReportLine::Rejected {
                    index,
                    reason: e.reason().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Apply every action in order, then report the staged draft.
    ///
    /// A rejected action does not stop the script.
    pub fn run(&mut self, actions: Vec<serde_json::Value>) -> Vec<ReportLine> {
        let mut lines: Vec<ReportLine> = actions
            .into_iter()
            .enumerate()
            .map(|(index, action)| self.step(index, action))
            .collect();
        lines.push(ReportLine::Draft {
            payload: self.session.export_payload(),
        });
        lines
    }
}
