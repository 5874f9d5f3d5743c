//! Running median smoothing
//!
//! The window is kept twice: once in arrival order (to know which sample
//! expires next) and once sorted (to read the median). Each slide removes the
//! expiring sample from the sorted copy by binary search and inserts the new one
//! at its sorted position, so a step costs `O(log M)` comparisons plus one
//! `O(M)` shift instead of a full re-sort.

use std::collections::VecDeque;

use crate::error::{ConfigError, Result};

/// Default window size for `rawsmooth`
pub const DEFAULT_MEDIAN_WINDOW: usize = 21;

/// A validated, odd window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedianWindow(usize);
impl MedianWindow {
    pub fn new(size: usize) -> Result<Self> {
        if size % 2 == 0 {
            return Err(ConfigError::EvenWindow(size).into());
        }
        Ok(Self(size))
    }

    #[must_use]
    pub fn size(self) -> usize {
        self.0
    }

    /// Number of samples on either side of the centre
    #[must_use]
    pub fn half(self) -> usize {
        self.0 / 2
    }
}
impl Default for MedianWindow {
    fn default() -> Self {
        Self(DEFAULT_MEDIAN_WINDOW)
    }
}

/// A sliding window that always knows its median
#[derive(Debug, Clone)]
pub struct RunningMedian<T> {
    window: MedianWindow,
    arrivals: VecDeque<T>,
    sorted: Vec<T>,
}
impl<T: Ord + Copy> RunningMedian<T> {
    #[must_use]
    pub fn new(window: MedianWindow) -> Self {
        Self {
            window,
            arrivals: VecDeque::with_capacity(window.size()),
            sorted: Vec::with_capacity(window.size()),
        }
    }

    /// Pushes a sample, evicting the oldest one once the window is full
    pub fn push(&mut self, item: T) {
        if self.arrivals.len() == self.window.size() {
            if let Some(old) = self.arrivals.pop_front() {
                let pos = self.sorted.partition_point(|x| *x < old);
                self.sorted.remove(pos);
            }
        }
        self.arrivals.push_back(item);
        let pos = self.sorted.partition_point(|x| *x < item);
        self.sorted.insert(pos, item);
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.arrivals.len() == self.window.size()
    }

    /// Median of the current window (upper median while the window is filling)
    #[must_use]
    pub fn median(&self) -> Option<T> {
        self.sorted.get(self.sorted.len() / 2).copied()
    }
}

/// Smooths `seq` with a running median of the given window size
///
/// The output has the same length as the input. The first `M/2` values (and the
/// value at `M/2` itself) are the median of the first `M` samples, every later
/// value is the median of the window ending `M/2` samples ahead of it, and the
/// last `M/2` values repeat the median of the final window. Input shorter than
/// the window is smoothed to the median of the whole input.
pub fn median_filter<T: Ord + Copy>(seq: &[T], window: usize) -> Result<Vec<T>> {
    let window = MedianWindow::new(window)?;
    Ok(smooth(seq, window))
}

/// As [`median_filter`] with an already validated window
#[must_use]
pub fn smooth<T: Ord + Copy>(seq: &[T], window: MedianWindow) -> Vec<T> {
    let size = window.size();
    let mut running = RunningMedian::new(window);
    if seq.len() < size {
        seq.iter().for_each(|&x| running.push(x));
        return running
            .median()
            .map(|m| vec![m; seq.len()])
            .unwrap_or_default();
    }

    let mut out = Vec::with_capacity(seq.len());
    seq[..size].iter().for_each(|&x| running.push(x));
    let Some(first) = running.median() else {
        return out;
    };
    out.resize(window.half() + 1, first);
    for &item in &seq[size..] {
        running.push(item);
        out.extend(running.median());
    }
    let last = out.last().copied().unwrap_or(first);
    out.resize(seq.len(), last);
    out
}
