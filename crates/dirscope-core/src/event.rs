//! Scan notifications and the observer fan-out.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// A notification emitted while a scan runs.
///
/// Events borrow the entry they describe and are delivered synchronously, so
/// an observer that needs to keep data must copy it out.
#[derive(Debug, Clone, Copy)]
pub enum ScanEvent<'a> {
    /// A directory was entered; nothing below it has been processed yet.
    DirectoryStarted(&'a Entry),
    /// A file's metadata is known and it has been appended to its parent.
    FileDiscovered(&'a Entry),
    /// Every descendant is finished and the directory's size is final.
    DirectoryFinished(&'a Entry),
    /// The root is finished; fired once, last.
    ScanCompleted(&'a Entry),
}

impl<'a> ScanEvent<'a> {
    /// The entry this event refers to.
    pub fn entry(&self) -> &'a Entry {
        match *self {
            ScanEvent::DirectoryStarted(entry)
            | ScanEvent::FileDiscovered(entry)
            | ScanEvent::DirectoryFinished(entry)
            | ScanEvent::ScanCompleted(entry) => entry,
        }
    }

    pub fn kind(&self) -> ScanEventKind {
        match self {
            ScanEvent::DirectoryStarted(_) => ScanEventKind::DirectoryStarted,
            ScanEvent::FileDiscovered(_) => ScanEventKind::FileDiscovered,
            ScanEvent::DirectoryFinished(_) => ScanEventKind::DirectoryFinished,
            ScanEvent::ScanCompleted(_) => ScanEventKind::ScanCompleted,
        }
    }
}

/// Discriminant of a [`ScanEvent`], without the borrowed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanEventKind {
    DirectoryStarted,
    FileDiscovered,
    DirectoryFinished,
    ScanCompleted,
}

/// Receiver of scan notifications.
///
/// Called from whichever task produced the event. Implementations must be
/// cheap; the engine waits for `on_event` to return before continuing that
/// unit of work. A panic in an observer is not caught by the engine.
pub trait ScanObserver: Send + Sync {
    fn on_event(&self, event: ScanEvent<'_>);
}

impl<F> ScanObserver for F
where
    F: Fn(ScanEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: ScanEvent<'_>) {
        self(event)
    }
}

/// Fan-out list of subscribed observers.
#[derive(Clone, Default)]
pub struct Observers {
    subscribers: Vec<Arc<dyn ScanObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. It receives every event emitted from now on.
    pub fn subscribe(&mut self, observer: Arc<dyn ScanObserver>) {
        self.subscribers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver an event to every observer, in subscription order.
    pub fn emit(&self, event: ScanEvent<'_>) {
        for subscriber in &self.subscribers {
            subscriber.on_event(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
