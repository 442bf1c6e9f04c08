//! Batch lifecycle notifications.

/// Milestones of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started { items: usize },
    Succeeded { offers: usize },
    /// Every `(item, site)` search in a non-empty batch failed.
    Failed { message: String },
}

/// Receives batch events. Notification is fire-and-forget: implementations
/// must not block and cannot fail the batch.
pub trait BatchNotifier: Send + Sync {
    fn notify(&self, event: &BatchEvent);
}

/// Default notifier: emits each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl BatchNotifier for LogNotifier {
    fn notify(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { items } => tracing::info!(items, "scrape batch started"),
            BatchEvent::Succeeded { offers } => {
                tracing::info!(offers, "scrape batch finished");
            }
            BatchEvent::Failed { message } => tracing::error!(%message, "scrape batch failed"),
        }
    }
}
