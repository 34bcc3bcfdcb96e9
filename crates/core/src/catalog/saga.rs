//! Compensating actions for multi-step flows.
//!
//! Each forward step that leaves something behind registers an undo future.
//! On abort the undo steps run newest-first; their failures are logged and
//! never replace the error that caused the abort.

use futures::future::BoxFuture;
use tracing::{debug, warn};

struct UndoStep {
    label: String,
    action: BoxFuture<'static, Result<(), String>>,
}

/// Ordered list of undo steps for one flow.
pub(crate) struct Saga {
    flow: &'static str,
    steps: Vec<UndoStep>,
}

impl Saga {
    pub(crate) fn new(flow: &'static str) -> Self {
        Self {
            flow,
            steps: Vec::new(),
        }
    }

    /// Register an undo step. The future is not polled until `compensate`.
    pub(crate) fn push(
        &mut self,
        label: impl Into<String>,
        action: BoxFuture<'static, Result<(), String>>,
    ) {
        self.steps.push(UndoStep {
            label: label.into(),
            action,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Run every registered undo step in reverse order.
    ///
    /// Returns the number of steps that failed.
    pub(crate) async fn compensate(self) -> usize {
        let mut failed = 0;
        for step in self.steps.into_iter().rev() {
            match step.action.await {
                Ok(()) => debug!(flow = self.flow, step = %step.label, "Compensated"),
                Err(error) => {
                    failed += 1;
                    warn!(
                        flow = self.flow,
                        step = %step.label,
                        error = %error,
                        "Compensation failed"
                    );
                }
            }
        }
        failed
    }

    /// The flow committed; drop the undo steps without running them.
    pub(crate) fn commit(self) {
        debug!(flow = self.flow, discarded = self.steps.len(), "Saga committed");
    }
}
