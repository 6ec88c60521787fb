//! Cursor over the ordered keyspace.
//!
//! An iterator reads from a pinned view: either the snapshot it was opened
//! at, or an implicit view of the latest state taken when it was created.
//! Positioning calls return engine failures directly and also retain them,
//! so [`DbIterator::status`] reports the last error until the next
//! successful positioning call.

use crate::database::SessionInner;
use crate::engine::{Entry, ReadView, ViewLease};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

/// Where the cursor currently is.
#[derive(Debug, Clone)]
pub enum IteratorState {
    /// No positioning call has been made yet.
    Unpositioned,
    /// On an entry.
    Valid,
    /// Ran off either end of the keyspace.
    Exhausted,
    /// The last positioning call failed; the error is retained.
    Degraded(Error),
}

enum Cursor {
    Unpositioned,
    Valid(Entry),
    Exhausted,
    Degraded(Error),
}

/// A positioned iterator over a database.
///
/// `key` and `value` return `None` unless [`valid`](Self::valid) is true.
pub struct DbIterator {
    view: Result<Arc<ViewLease>>,
    owner: Weak<SessionInner>,
    cursor: Cursor,
}

impl DbIterator {
    pub(crate) fn new(view: Result<Arc<ReadView>>, owner: &Arc<SessionInner>) -> Self {
        owner.live_iterators.fetch_add(1, Ordering::Relaxed);
        let view = view.map(|view| owner.lease(view));
        let cursor = match &view {
            Ok(_) => Cursor::Unpositioned,
            Err(e) => {
                owner.logger.warn(format_args!("iterator unavailable: {e}"));
                Cursor::Degraded(e.clone())
            }
        };
        Self {
            view,
            owner: Arc::downgrade(owner),
            cursor,
        }
    }

    /// Positions at the first entry.
    pub fn seek_to_first(&mut self) -> Result<()> {
        self.reposition(ReadView::first)
    }

    /// Positions at the last entry.
    pub fn seek_to_last(&mut self) -> Result<()> {
        self.reposition(ReadView::last)
    }

    /// Positions at the first entry with a key at or after `target`.
    pub fn seek(&mut self, target: &[u8]) -> Result<()> {
        self.reposition(|view| view.seek(target))
    }

    /// Advances to the next entry. A no-op while invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        let Cursor::Valid((key, _)) = &self.cursor else {
            return Ok(());
        };
        let key = key.clone();
        self.reposition(|view| view.after(&key))
    }

    /// Steps back to the previous entry. A no-op while invalid.
    pub fn prev(&mut self) -> Result<()> {
        let Cursor::Valid((key, _)) = &self.cursor else {
            return Ok(());
        };
        let key = key.clone();
        self.reposition(|view| view.before(&key))
    }

    /// Returns true if the iterator is on an entry.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.current().is_some()
    }

    /// Current key, or `None` when not valid.
    #[must_use]
    pub fn key(&self) -> Option<&[u8]> {
        self.current().map(|(key, _)| key.as_slice())
    }

    /// Current value, or `None` when not valid.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        self.current().map(|(_, value)| value.as_slice())
    }

    /// Last positioning outcome.
    ///
    /// Returns the retained error of a degraded iterator, or
    /// [`Error::Closed`] once the owning database is gone.
    pub fn status(&self) -> Result<()> {
        if self.owner.strong_count() == 0 {
            return Err(Error::closed("database"));
        }
        match &self.cursor {
            Cursor::Degraded(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /// Current state of the cursor.
    #[must_use]
    pub fn state(&self) -> IteratorState {
        match &self.cursor {
            Cursor::Unpositioned => IteratorState::Unpositioned,
            Cursor::Valid(_) => IteratorState::Valid,
            Cursor::Exhausted => IteratorState::Exhausted,
            Cursor::Degraded(e) => IteratorState::Degraded(e.clone()),
        }
    }

    /// Forward scan from the current position, or from the first entry if
    /// the iterator has not been positioned.
    pub fn entries(&mut self) -> Entries<'_> {
        Entries {
            iter: self,
            started: false,
            done: false,
        }
    }

    fn current(&self) -> Option<&Entry> {
        match &self.cursor {
            Cursor::Valid(entry) if self.owner.strong_count() > 0 => Some(entry),
            _ => None,
        }
    }

    fn reposition<F>(&mut self, step: F) -> Result<()>
    where
        F: FnOnce(&ReadView) -> Result<Option<Entry>>,
    {
        let Some(owner) = self.owner.upgrade() else {
            self.cursor = Cursor::Exhausted;
            return Err(Error::closed("database"));
        };
        let outcome = match &self.view {
            Ok(lease) => lease.get().and_then(|view| step(&view)),
            Err(e) => Err(e.clone()),
        };
        match outcome {
            Ok(Some(entry)) => {
                self.cursor = Cursor::Valid(entry);
                Ok(())
            }
            Ok(None) => {
                self.cursor = Cursor::Exhausted;
                Ok(())
            }
            Err(e) => {
                owner.logger.warn(format_args!("iterator degraded: {e}"));
                self.cursor = Cursor::Degraded(e.clone());
                Err(e)
            }
        }
    }
}

impl Drop for DbIterator {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.live_iterators.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for DbIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbIterator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Owned entries produced by [`DbIterator::entries`].
#[derive(Debug)]
pub struct Entries<'a> {
    iter: &'a mut DbIterator,
    started: bool,
    done: bool,
}

impl Iterator for Entries<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = if !self.started {
            self.started = true;
            match self.iter.cursor {
                Cursor::Unpositioned => self.iter.seek_to_first(),
                _ => self.iter.status(),
            }
        } else {
            self.iter.next()
        };
        if let Err(e) = step {
            self.done = true;
            return Some(Err(e));
        }
        match self.iter.current() {
            Some((key, value)) => Some(Ok((key.clone(), value.clone()))),
            None => {
                self.done = true;
                None
            }
        }
    }
}
