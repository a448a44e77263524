use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Per-category load counters. Values combine additively, batch by batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoadStatistics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Always equal to `succeeded`: every ingested record starts pending.
    pub pending: usize,
}

impl LoadStatistics {
    pub fn considered(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn inserted(self, count: usize) -> Self {
        Self {
            succeeded: self.succeeded + count,
            pending: self.pending + count,
            ..self
        }
    }

    pub fn failed(self, count: usize) -> Self {
        Self {
            failed: self.failed + count,
            ..self
        }
    }

    pub fn skipped(self, count: usize) -> Self {
        Self {
            skipped: self.skipped + count,
            ..self
        }
    }

    /// `succeeded / total`, or 0 when nothing was considered.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    /// Every considered record is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.failed + self.skipped == self.total && self.pending == self.succeeded
    }
}

impl Add for LoadStatistics {
    type Output = LoadStatistics;

    fn add(self, rhs: LoadStatistics) -> LoadStatistics {
        LoadStatistics {
            total: self.total + rhs.total,
            succeeded: self.succeeded + rhs.succeeded,
            failed: self.failed + rhs.failed,
            skipped: self.skipped + rhs.skipped,
            pending: self.pending + rhs.pending,
        }
    }
}

impl AddAssign for LoadStatistics {
    fn add_assign(&mut self, rhs: LoadStatistics) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for LoadStatistics {
    fn sum<I: Iterator<Item = LoadStatistics>>(iter: I) -> Self {
        iter.fold(LoadStatistics::default(), Add::add)
    }
}
