//! Transaction log: batched undo/redo over edit operations.
//!
//! The log records operations; it does not apply them when they are pushed.
//! Undo and redo replay inverse or forward patches against the world a batch
//! at a time. Every operation of a batch is checked against the world before
//! any of them is applied, so a batch is never left half applied.

use crate::patch::{EditOp, PatchSide};
use crate::world::{World, WorldError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info};

/// Default bound on the undo stack
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Kind recorded for operations pushed outside an explicit batch
pub const IMPLICIT_BATCH: &str = "single";

/// Errors from misuse of the log or from replaying it
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("batch '{0}' is already open")]
    BatchAlreadyOpen(String),

    #[error("cannot undo or redo while batch '{0}' is open")]
    BatchOpen(String),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Operations applied or reverted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub kind: String,
    pub ops: Vec<EditOp>,
}

impl Batch {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ops: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply forward patches in recorded order
    fn redo_on(&self, world: &mut World) -> Result<(), WorldError> {
        for op in &self.ops {
            world.check_op(op)?;
        }
        for op in &self.ops {
            world.apply_op(op, PatchSide::Forward)?;
        }
        Ok(())
    }

    /// Apply inverse patches, last operation first
    pub(crate) fn undo_on(&self, world: &mut World) -> Result<(), WorldError> {
        for op in &self.ops {
            world.check_op(op)?;
        }
        for op in self.ops.iter().rev() {
            world.apply_op(op, PatchSide::Inverse)?;
        }
        Ok(())
    }
}

/// Undo stack, redo stack and at most one open batch
#[derive(Debug, Clone)]
pub struct TransactionLog {
    undo: VecDeque<Batch>,
    redo: Vec<Batch>,
    open: Option<Batch>,
    max_depth: usize,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl TransactionLog {
    /// A log keeping at most `max_depth` undo entries (at least one)
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            open: None,
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Undo entries, oldest first
    pub fn undo_stack(&self) -> impl Iterator<Item = &Batch> {
        self.undo.iter()
    }

    pub fn open_batch(&self) -> Option<&Batch> {
        self.open.as_ref()
    }

    pub fn is_batch_open(&self) -> bool {
        self.open.is_some()
    }

    /// Open a new empty batch
    pub fn begin_batch(&mut self, kind: impl Into<String>) -> Result<(), HistoryError> {
        if let Some(open) = &self.open {
            return Err(HistoryError::BatchAlreadyOpen(open.kind.clone()));
        }
        self.open = Some(Batch::new(kind));
        Ok(())
    }

    /// Record an operation.
    ///
    /// Goes into the open batch, or becomes a one-operation batch on the undo
    /// stack. Either way the redo stack is cleared.
    pub fn push_op(&mut self, op: EditOp) {
        self.redo.clear();
        match &mut self.open {
            Some(batch) => batch.ops.push(op),
            None => {
                let mut batch = Batch::new(IMPLICIT_BATCH);
                batch.ops.push(op);
                self.push_undo(batch);
            }
        }
    }

    /// Move the open batch onto the undo stack.
    ///
    /// Returns the number of operations committed; an empty or missing batch
    /// commits nothing.
    pub fn commit_batch(&mut self) -> Option<usize> {
        let batch = self.open.take()?;
        if batch.is_empty() {
            debug!(kind = %batch.kind, "discarded empty batch");
            return None;
        }
        let len = batch.len();
        debug!(kind = %batch.kind, ops = len, "committed batch");
        self.push_undo(batch);
        Some(len)
    }

    /// Close the open batch without recording it
    pub fn take_open_batch(&mut self) -> Option<Batch> {
        self.open.take()
    }

    fn push_undo(&mut self, batch: Batch) {
        self.undo.push_back(batch);
        while self.undo.len() > self.max_depth {
            if let Some(evicted) = self.undo.pop_front() {
                debug!(kind = %evicted.kind, "evicted oldest undo entry");
            }
        }
    }

    fn ensure_closed(&self) -> Result<(), HistoryError> {
        match &self.open {
            Some(open) => Err(HistoryError::BatchOpen(open.kind.clone())),
            None => Ok(()),
        }
    }

    /// Revert the most recent batch. `Ok(None)` when there is nothing to undo.
    pub fn undo(&mut self, world: &mut World) -> Result<Option<&Batch>, HistoryError> {
        self.ensure_closed()?;
        let Some(batch) = self.undo.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = batch.undo_on(world) {
            self.undo.push_back(batch);
            return Err(err.into());
        }
        info!(kind = %batch.kind, ops = batch.len(), "undo");
        self.redo.push(batch);
        Ok(self.redo.last())
    }

    /// Re-apply the most recently undone batch. `Ok(None)` when there is nothing to redo.
    pub fn redo(&mut self, world: &mut World) -> Result<Option<&Batch>, HistoryError> {
        self.ensure_closed()?;
        let Some(batch) = self.redo.pop() else {
            return Ok(None);
        };
        if let Err(err) = batch.redo_on(world) {
            self.redo.push(batch);
            return Err(err.into());
        }
        info!(kind = %batch.kind, ops = batch.len(), "redo");
        self.push_undo(batch);
        Ok(self.undo.back())
    }

    /// Forget everything, including an open batch
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.open = None;
    }
}
