//! Command Dispatcher
//!
//! Confirmed decision → `ALARM:<NAME>` in the command queue, written only
//! when it differs from the newest pending command. Fire-and-forget: no
//! acknowledgement is awaited.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::alarm::Decision;
use crate::logic::store::{call_with_timeout, CommandQueue, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    /// A new pending command was inserted
    Written(String),
    /// The newest pending command already says this
    Deduplicated(String),
}

impl DispatchOutcome {
    pub fn was_written(&self) -> bool {
        matches!(self, DispatchOutcome::Written(_))
    }

    pub fn command(&self) -> &str {
        match self {
            DispatchOutcome::Written(c) | DispatchOutcome::Deduplicated(c) => c,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Dedup check could not run
    #[error("failed to read pending command: {0}")]
    Read(#[source] StoreError),

    #[error("failed to enqueue '{command}': {source}")]
    Write {
        command: String,
        #[source]
        source: StoreError,
    },
}

impl DispatchError {
    pub fn is_timeout(&self) -> bool {
        match self {
            DispatchError::Read(e) => e.is_timeout(),
            DispatchError::Write { source, .. } => source.is_timeout(),
        }
    }
}

pub struct CommandDispatcher {
    queue: Arc<dyn CommandQueue>,
    call_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(queue: Arc<dyn CommandQueue>, call_timeout: Duration) -> Self {
        Self { queue, call_timeout }
    }

    pub async fn dispatch(&self, decision: Decision) -> Result<DispatchOutcome, DispatchError> {
        let command = decision.command();

        let queue = Arc::clone(&self.queue);
        let latest = call_with_timeout(self.call_timeout, move || queue.latest_pending())
            .await
            .map_err(DispatchError::Read)?;

        if latest.as_ref().map(|c| c.label.as_str()) == Some(command.as_str()) {
            log::debug!("Command {} already pending, not re-sent", command);
            return Ok(DispatchOutcome::Deduplicated(command));
        }

        let queue = Arc::clone(&self.queue);
        let label = command.clone();
        call_with_timeout(self.call_timeout, move || queue.enqueue(&label))
            .await
            .map_err(|source| DispatchError::Write {
                command: command.clone(),
                source,
            })?;

        log::info!("Command queued: {}", command);
        Ok(DispatchOutcome::Written(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::alarm::ClassLabel;
    use crate::logic::store::InMemoryStore;

    fn dispatcher(store: &Arc<InMemoryStore>) -> CommandDispatcher {
        CommandDispatcher::new(store.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_writes_once_for_repeated_decision() {
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(&store);
        let fire = Decision::Alarm(ClassLabel::Fire);

        assert!(d.dispatch(fire).await.unwrap().was_written());
        for _ in 0..5 {
            assert_eq!(
                d.dispatch(fire).await.unwrap(),
                DispatchOutcome::Deduplicated("ALARM:FIRE".to_string())
            );
        }
        assert_eq!(store.command_labels(), vec!["ALARM:FIRE"]);
    }

    #[tokio::test]
    async fn test_change_is_written() {
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(&store);

        d.dispatch(Decision::Alarm(ClassLabel::Gas)).await.unwrap();
        d.dispatch(Decision::Normal).await.unwrap();
        assert_eq!(store.command_labels(), vec!["ALARM:GAS", "ALARM:NORMAL"]);
    }

    #[tokio::test]
    async fn test_delivered_command_does_not_dedup() {
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(&store);

        d.dispatch(Decision::Normal).await.unwrap();
        store.deliver_all();
        assert!(d.dispatch(Decision::Normal).await.unwrap().was_written());
        assert_eq!(store.commands().len(), 2);
    }

    #[tokio::test]
    async fn test_read_and_write_failures_are_distinct() {
        let store = Arc::new(InMemoryStore::new());
        let d = dispatcher(&store);

        store.set_fail_pending(true);
        let err = d.dispatch(Decision::Normal).await.unwrap_err();
        assert!(matches!(err, DispatchError::Read(_)));

        store.set_fail_pending(false);
        store.set_fail_enqueue(true);
        let err = d.dispatch(Decision::Normal).await.unwrap_err();
        assert!(matches!(err, DispatchError::Write { .. }));
        assert!(!err.is_timeout());
        assert!(store.commands().is_empty());
    }

    #[tokio::test]
    async fn test_slow_queue_times_out() {
        let store = Arc::new(InMemoryStore::new());
        store.set_delay(Some(Duration::from_millis(300)));
        let d = CommandDispatcher::new(store.clone(), Duration::from_millis(20));

        let err = d.dispatch(Decision::Normal).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
