use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use chrono::NaiveDate;

use crate::collection::CollectionManager;
use crate::store::{Item, ItemStore};

/// A host "item added/updated" notification. The event carries everything
/// the membership retry needs — location, year, run dates — so the handler
/// never re-derives them from the label (re-derivation may not reproduce
/// identical inputs).
#[derive(Debug, Clone)]
pub struct RunEvent {
    /// The item as the host now sees it; expected to carry a durable id.
    pub item: Item,
    pub location: String,
    pub year: i32,
    pub run_dates: Vec<NaiveDate>,
}

/// Queue consumer that re-attempts collection membership once the host has
/// assigned an item its durable identity. Submissions are fire-and-forget;
/// processing happens on a dedicated worker so it never blocks the primary
/// metadata path.
pub struct DeferredProcessor {
    tx: Option<Sender<RunEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl DeferredProcessor {
    pub fn spawn<S: ItemStore + Send + 'static>(manager: CollectionManager<S>) -> Self {
        let (tx, rx) = mpsc::channel::<RunEvent>();
        let worker = thread::spawn(move || {
            for event in rx {
                if event.item.id.is_none() {
                    log::debug!(
                        "event for '{}' still has no durable id, skipping",
                        event.item.name
                    );
                    continue;
                }
                if let Err(e) = manager.process_run(
                    &event.item,
                    &event.location,
                    event.year,
                    &event.run_dates,
                ) {
                    // Retryable: the next host event for this item re-attempts
                    log::warn!(
                        "deferred run processing failed for '{}': {e}",
                        event.item.name
                    );
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queue an event for processing.
    pub fn submit(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::warn!("deferred processor worker is gone, event dropped");
            }
        }
    }

    /// Drain the queue and stop the worker.
    pub fn shutdown(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("deferred processing worker panicked");
            }
        }
    }
}

impl Drop for DeferredProcessor {
    fn drop(&mut self) {
        self.finish();
    }
}
