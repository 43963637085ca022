use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{GraphError, Result};

/// Single-writer, multiple-reader bookkeeping for graph handles.
///
/// Readers are counted but never excluded. The writer slot is exclusive and
/// fails fast instead of blocking.
#[derive(Clone, Default)]
pub struct SingleWriter {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<LockState>,
}

#[derive(Default, Debug)]
struct LockState {
    readers: u32,
    writer: bool,
}

/// Snapshot of lock state for observability.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    /// Number of active readers.
    pub readers: u32,
    /// Whether the writer slot is held.
    pub writer: bool,
}

/// Guard representing a registered reader.
pub struct ReaderGuard {
    _guard: SlotGuard,
}

/// Guard representing the held writer slot.
pub struct WriterGuard {
    _guard: SlotGuard,
}

impl SingleWriter {
    /// Creates an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reader. Readers never wait.
    pub fn acquire_reader(&self) -> ReaderGuard {
        let mut state = self.inner.state.lock();
        state.readers = state.readers.saturating_add(1);
        drop(state);
        ReaderGuard {
            _guard: SlotGuard::new(self.inner.clone(), Slot::Reader),
        }
    }

    /// Claims the writer slot.
    ///
    /// Returns [`GraphError::WriterActive`] while another [`WriterGuard`] is alive.
    pub fn try_acquire_writer(&self) -> Result<WriterGuard> {
        let mut state = self.inner.state.lock();
        if state.writer {
            return Err(GraphError::WriterActive);
        }
        state.writer = true;
        drop(state);
        Ok(WriterGuard {
            _guard: SlotGuard::new(self.inner.clone(), Slot::Writer),
        })
    }

    /// Returns a snapshot of the current lock state.
    pub fn snapshot(&self) -> LockSnapshot {
        let state = self.inner.state.lock();
        LockSnapshot {
            readers: state.readers,
            writer: state.writer,
        }
    }
}

struct SlotGuard {
    inner: Arc<Inner>,
    slot: Slot,
}

impl SlotGuard {
    fn new(inner: Arc<Inner>, slot: Slot) -> Self {
        Self { inner, slot }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        match self.slot {
            Slot::Reader => {
                debug_assert!(state.readers > 0, "reader released more often than acquired");
                state.readers = state.readers.saturating_sub(1);
            }
            Slot::Writer => {
                debug_assert!(state.writer, "writer slot released while not held");
                state.writer = false;
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Slot {
    Reader,
    Writer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_are_counted_until_dropped() {
        let lock = SingleWriter::new();
        let r1 = lock.acquire_reader();
        let r2 = lock.acquire_reader();
        assert_eq!(lock.snapshot().readers, 2);
        drop(r1);
        assert_eq!(lock.snapshot().readers, 1);
        drop(r2);
        assert_eq!(lock.snapshot(), LockSnapshot::default());
    }

    #[test]
    fn second_writer_is_rejected() {
        let lock = SingleWriter::new();
        let writer = lock.try_acquire_writer().unwrap();
        assert!(matches!(
            lock.try_acquire_writer(),
            Err(GraphError::WriterActive)
        ));
        drop(writer);
        assert!(lock.try_acquire_writer().is_ok());
    }

    #[test]
    fn readers_do_not_block_writer() {
        let lock = SingleWriter::new();
        let _reader = lock.acquire_reader();
        let _writer = lock.try_acquire_writer().unwrap();
        let snapshot = lock.snapshot();
        assert_eq!(snapshot.readers, 1);
        assert!(snapshot.writer);
    }
}
