//! Fixed-length sliding window of recent samples for one signal.
use std::collections::VecDeque;

use crate::error::ControlError;
use crate::util::round3;

/// Number of samples a window holds before it yields an average.
pub const WINDOW_LEN: usize = 5;

/// FIFO of the most recent samples; the oldest is evicted once full.
#[derive(Debug, Clone)]
pub struct SignalWindow<T> {
    buf: VecDeque<T>,
    cap: usize,
}

impl<T: Copy> Default for SignalWindow<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> SignalWindow<T> {
    pub fn new() -> Self {
        Self::with_len(WINDOW_LEN)
    }

    pub fn with_len(len: usize) -> Self {
        let cap = len.max(1);
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, v: T) {
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(v);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.cap
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<T> {
        self.buf.back().copied()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.buf.iter().copied()
    }

    fn require_full(&self) -> Result<(), ControlError> {
        if self.is_full() {
            Ok(())
        } else {
            Err(ControlError::InsufficientData {
                have: self.buf.len(),
                need: self.cap,
            })
        }
    }
}

impl SignalWindow<f64> {
    /// Mean of exactly the last `capacity()` samples, rounded to 3 decimals.
    pub fn mean(&self) -> Result<f64, ControlError> {
        self.require_full()?;
        let sum: f64 = self.buf.iter().sum();
        Ok(round3(sum / self.cap as f64))
    }
}

impl SignalWindow<bool> {
    /// True when the window is full and every sample equals `value`.
    pub fn all_agree(&self, value: bool) -> bool {
        self.require_full().is_ok() && self.buf.iter().all(|&b| b == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_requires_a_full_window() {
        let mut w = SignalWindow::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(
            w.mean(),
            Err(ControlError::InsufficientData { have: 4, need: 5 })
        );
        w.push(5.0);
        assert_eq!(w.mean(), Ok(3.0));
    }

    #[test]
    fn oldest_sample_is_evicted() {
        let mut w = SignalWindow::new();
        for v in [100.0, 1.0, 1.0, 1.0, 1.0, 1.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.mean(), Ok(1.0));
        assert_eq!(w.latest(), Some(1.0));
    }

    #[test]
    fn debounce_needs_unanimous_full_window() {
        let mut w = SignalWindow::new();
        for _ in 0..4 {
            w.push(true);
        }
        assert!(!w.all_agree(true));
        w.push(true);
        assert!(w.all_agree(true));
        w.push(false);
        assert!(!w.all_agree(true));
        assert!(!w.all_agree(false));
        w.clear();
        assert!(w.is_empty());
    }
}
