//! Low-level building blocks used by the graph store.
//!
//! Includes the reader/writer coordination latch and the clock abstraction
//! that timestamps revisions.

/// Wall-clock sources.
///
/// Every revision timestamp and trimming decision is taken from a [`clock::Clock`],
/// which lets tests drive time explicitly.
pub mod clock;

/// Concurrency primitives and synchronization.
///
/// Single-writer, multiple-reader bookkeeping for graph handles.
pub mod concurrency;
