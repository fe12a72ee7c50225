//! Bounded event scheduler.
//!
//! A fixed-capacity, allocation-free queue carrying [`Event`] payloads
//! from ISR/timer producers to the single main-loop consumer.
//!
//! ```text
//!   slot timer ──┐
//!   zero-cross ──┼──▶ submit() ──▶ [ring, cap 32] ──▶ drain() ──▶ LampService
//!   mesh ingress ┘      (ISR-safe, non-blocking)        (main loop only)
//! ```
//!
//! Producers reserve a cell with a compare-and-swap on the head counter,
//! copy the payload in, then publish it with a per-cell ready flag. The
//! consumer clears the flag before advancing the tail, so a reserved cell
//! is never handed out twice. A full queue rejects the submission and
//! counts a drop; nothing ever blocks.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::events::Event;

/// Queue capacity. Sized for the worst-case burst: one slot tick plus
/// both lux samples plus a mesh command still leaves headroom.
pub const QUEUE_CAP: usize = 32;

/// Returned by [`EventQueue::submit`] when the queue is full.
/// The event was dropped and counted; the producer must not retry in ISR
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull {
    /// Tag of the dropped event, for diagnostics.
    pub tag: &'static str,
}

impl core::fmt::Display for QueueFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "event queue full (dropped {})", self.tag)
    }
}

/// Counters snapshot. Invariant: `submitted == processed + dropped + queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub submitted: u32,
    pub processed: u32,
    pub dropped: u32,
    pub queued: u32,
}

struct Cell {
    ready: AtomicBool,
    payload: UnsafeCell<MaybeUninit<Event>>,
}

impl Cell {
    const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            payload: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Multi-producer, single-consumer event ring.
///
/// Owned by `main` and handed to producers by `&'static` reference (ISR
/// callbacks need `'static` access; everything else receives it as a
/// plain borrow).
pub struct EventQueue {
    cells: [Cell; QUEUE_CAP],
    /// Monotonic write counter; cell index is `head % QUEUE_CAP`.
    head: AtomicUsize,
    /// Monotonic read counter, advanced only by the consumer.
    tail: AtomicUsize,
    submitted: AtomicU32,
    processed: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: cell payloads are only written by the producer that won the
// head CAS for that cell, and only read by the single consumer after the
// ready flag is published with Release/Acquire ordering.
unsafe impl Sync for EventQueue {}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            cells: [const { Cell::new() }; QUEUE_CAP],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            submitted: AtomicU32::new(0),
            processed: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Submit an event. Non-blocking and ISR-safe: the payload is copied
    /// into the ring before the call returns. A full queue counts a drop
    /// and returns `Err` without touching the stored events.
    pub fn submit(&self, event: Event) -> Result<(), QueueFull> {
        self.submitted.fetch_add(1, Ordering::Relaxed);

        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            if head.wrapping_sub(tail) >= QUEUE_CAP {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Err(QueueFull { tag: event.tag() });
            }
            match self.head.compare_exchange_weak(
                head,
                head.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => head = current,
            }
        }

        let cell = &self.cells[head % QUEUE_CAP];
        // SAFETY: the CAS above gave this producer exclusive ownership of
        // the cell; the consumer cleared `ready` before releasing it.
        unsafe {
            (*cell.payload.get()).write(event);
        }
        cell.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Pop the oldest event, if any. Single-consumer: must only be called
    /// from the main loop.
    pub fn pop(&self) -> Option<Event> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }

        let cell = &self.cells[tail % QUEUE_CAP];
        if !cell.ready.load(Ordering::Acquire) {
            // A producer reserved the cell but hasn't finished the copy;
            // it will be visible on the next drain pass.
            return None;
        }

        // SAFETY: ready was published after the producer's write, and
        // only this (single) consumer reads payloads.
        let event = unsafe { (*cell.payload.get()).assume_init_read() };
        cell.ready.store(false, Ordering::Release);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(event)
    }

    /// Drain up to `max` events in FIFO order, dispatching each through
    /// `handler`. Returns the number handled. Bounding the batch keeps
    /// the main loop responsive under a producer storm.
    pub fn drain<F: FnMut(Event)>(&self, max: usize, mut handler: F) -> usize {
        let mut handled = 0;
        while handled < max {
            let Some(event) = self.pop() else { break };
            handler(event);
            self.processed.fetch_add(1, Ordering::Relaxed);
            handled += 1;
        }
        handled
    }

    /// Events currently waiting.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            queued: self.len() as u32,
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
