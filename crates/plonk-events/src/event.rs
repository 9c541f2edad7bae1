use crate::OperationId;

/// All event types emitted by plonk operations.
#[derive(Debug, Clone)]
pub enum PlonkEvent {
    /// Reconciliation of one domain is starting.
    ReconcileStarting { domain: String },
    /// Reconciliation of one domain finished.
    ReconcileComplete {
        domain: String,
        managed: usize,
        missing: usize,
        drifted: usize,
        untracked: usize,
    },
    /// An apply/install/uninstall/upgrade item moved into progress.
    ItemStarted {
        op_id: OperationId,
        name: String,
        manager: Option<String>,
        stage: ItemStage,
    },
    /// Item finished successfully.
    ItemComplete {
        op_id: OperationId,
        name: String,
        manager: Option<String>,
    },
    /// Item failed; the batch continues.
    ItemFailed {
        op_id: OperationId,
        name: String,
        manager: Option<String>,
        error: String,
    },
    /// Item was skipped (dry run, already satisfied, filtered out).
    ItemSkipped {
        op_id: OperationId,
        name: String,
        reason: String,
    },
    /// Batch operation overall progress.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
}

/// Stages of a single apply item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStage {
    /// Installing a package through its manager.
    Installing,
    /// Uninstalling a package through its manager.
    Uninstalling,
    /// Upgrading a package through its manager.
    Upgrading,
    /// Deploying a dotfile to its destination.
    Deploying,
    /// Recording the outcome in the lock file.
    RecordingLock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_cloneable() {
        let event = PlonkEvent::ItemStarted {
            op_id: 1,
            name: "jq".into(),
            manager: Some("brew".into()),
            stage: ItemStage::Installing,
        };
        let copy = event.clone();
        assert!(matches!(
            copy,
            PlonkEvent::ItemStarted {
                stage: ItemStage::Installing,
                ..
            }
        ));
    }
}
