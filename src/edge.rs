//! Fixed-capacity ring buffer of `(time, value)` samples backing one edge.
//!
//! A node's scratch state usually only needs the latest value, which is
//! all `StreamPeekRef` exposes; subscribers that declared a history depth
//! at build time read further back through [`EdgeBuffer::at`]. See
//! [`crate::ops::history`] for how a subscription declares that depth and
//! gets an `at(k)`-capable handle back.

use crate::error::RuntimeRecoverable;
use crate::time::NanoTime;

/// Ring buffer of samples for a single edge. Capacity is fixed at
/// construction (`depth + 1`, per the subscriber that asked for the
/// deepest history) so there is no allocation once the run starts.
#[derive(Debug, Clone)]
pub struct EdgeBuffer<T> {
    name: String,
    samples: Vec<Option<(NanoTime, T)>>,
    capacity: usize,
    head: usize,
    len: usize,
    last_time: Option<NanoTime>,
}

impl<T: Clone> EdgeBuffer<T> {
    /// `depth` is the deepest `at(k)` any subscriber declared; the buffer
    /// keeps `depth + 1` samples (k=0 is the latest).
    pub fn new(name: impl Into<String>, depth: usize) -> Self {
        let capacity = depth + 1;
        Self {
            name: name.into(),
            samples: vec![None; capacity],
            capacity,
            head: 0,
            len: 0,
            last_time: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total samples retained (`depth + 1`, per [`EdgeBuffer::new`]).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `(t, v)` if `t` is strictly after the last sample; overwrite
    /// the last sample in place (without advancing the ring) if `t` equals
    /// it, matching the spec's idempotent same-time rewrite; fail with
    /// `TimeRegression` if `t` is behind the last sample.
    ///
    /// Returns `true` if this write should be treated as a fresh tick
    /// (consumers should be notified), `false` if it was an idempotent
    /// same-time overwrite (no re-notification).
    pub fn write(&mut self, t: NanoTime, v: T) -> Result<bool, TimeRegression> {
        match self.last_time {
            Some(last) if t < last => Err(TimeRegression { got: t, last }),
            Some(last) if t == last => {
                let idx = (self.head + self.capacity - 1) % self.capacity;
                self.samples[idx] = Some((t, v));
                Ok(false)
            }
            _ => {
                self.samples[self.head] = Some((t, v));
                self.head = (self.head + 1) % self.capacity;
                self.len = (self.len + 1).min(self.capacity);
                self.last_time = Some(t);
                Ok(true)
            }
        }
    }

    /// The latest sample, if any have been written.
    pub fn last(&self) -> Option<(NanoTime, &T)> {
        self.at(0).ok()
    }

    /// Sample `k` ticks ago; `k = 0` is the latest.
    pub fn at(&self, k: usize) -> Result<(NanoTime, &T), RuntimeRecoverable> {
        if k >= self.len {
            return Err(RuntimeRecoverable::HistoryUnderflow {
                edge: self.name.clone(),
                requested: k,
                available: self.len,
            });
        }
        let idx = (self.head + self.capacity - 1 - k) % self.capacity;
        let (t, v) = self.samples[idx].as_ref().expect("len tracked slot must be populated");
        Ok((*t, v))
    }

    pub fn ticked_at(&self, t: NanoTime) -> bool {
        self.last_time == Some(t)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("edge time regression: got {got}, last {last}")]
pub struct TimeRegression {
    pub got: NanoTime,
    pub last: NanoTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back() {
        let mut e = EdgeBuffer::new("e", 2);
        assert!(e.write(NanoTime::new(10), 1).unwrap());
        assert!(e.write(NanoTime::new(20), 2).unwrap());
        assert!(e.write(NanoTime::new(30), 3).unwrap());
        assert_eq!(e.at(0).unwrap(), (NanoTime::new(30), &3));
        assert_eq!(e.at(1).unwrap(), (NanoTime::new(20), &2));
        assert_eq!(e.at(2).unwrap(), (NanoTime::new(10), &1));
    }

    #[test]
    fn same_time_overwrite_is_idempotent_and_not_a_fresh_tick() {
        let mut e = EdgeBuffer::new("e", 1);
        assert!(e.write(NanoTime::new(10), 1).unwrap());
        assert!(!e.write(NanoTime::new(10), 2).unwrap());
        assert_eq!(e.at(0).unwrap(), (NanoTime::new(10), &2));
        assert!(e.at(1).is_err());
    }

    #[test]
    fn regression_is_rejected() {
        let mut e = EdgeBuffer::new("e", 1);
        e.write(NanoTime::new(10), 1).unwrap();
        let err = e.write(NanoTime::new(5), 2).unwrap_err();
        assert_eq!(err.got, NanoTime::new(5));
        assert_eq!(err.last, NanoTime::new(10));
    }

    #[test]
    fn history_underflow_past_available_depth() {
        let mut e = EdgeBuffer::new("e", 3);
        e.write(NanoTime::new(10), 1).unwrap();
        assert!(e.at(0).is_ok());
        assert!(matches!(
            e.at(1),
            Err(RuntimeRecoverable::HistoryUnderflow { .. })
        ));
    }

    #[test]
    fn ring_evicts_oldest_past_capacity() {
        let mut e = EdgeBuffer::new("e", 1); // capacity 2
        e.write(NanoTime::new(10), 1).unwrap();
        e.write(NanoTime::new(20), 2).unwrap();
        e.write(NanoTime::new(30), 3).unwrap();
        assert_eq!(e.at(0).unwrap(), (NanoTime::new(30), &3));
        assert_eq!(e.at(1).unwrap(), (NanoTime::new(20), &2));
        assert!(e.at(2).is_err());
    }
}
