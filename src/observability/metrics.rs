//! Validation metrics
//!
//! - Counters only, monotonic
//! - One registry per resolved schema registry
//! - Relaxed atomics; exact totals once callers are quiescent

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::validate::ErrorKind;

/// Validation counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Inputs accepted as records
    records_validated: AtomicU64,
    /// Inputs rejected
    records_rejected: AtomicU64,
    coercion_failures: AtomicU64,
    constraint_failures: AtomicU64,
    model_failures: AtomicU64,
    missing_fields: AtomicU64,
    extra_fields: AtomicU64,
    /// Accepted assignments
    assignments: AtomicU64,
    /// Rejected assignments (including frozen)
    assignments_rejected: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_records_validated(&self) {
        self.records_validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_records_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_assignments(&self) {
        self.assignments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_assignments_rejected(&self) {
        self.assignments_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one issue by kind
    pub fn record_issue(&self, kind: &ErrorKind) {
        let counter = match kind {
            ErrorKind::Coercion { .. } | ErrorKind::InvalidJson => &self.coercion_failures,
            ErrorKind::Constraint { .. } => &self.constraint_failures,
            ErrorKind::Model => &self.model_failures,
            ErrorKind::Missing => &self.missing_fields,
            ErrorKind::ExtraForbidden => &self.extra_fields,
            ErrorKind::Frozen => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_validated: self.records_validated.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            coercion_failures: self.coercion_failures.load(Ordering::Relaxed),
            constraint_failures: self.constraint_failures.load(Ordering::Relaxed),
            model_failures: self.model_failures.load(Ordering::Relaxed),
            missing_fields: self.missing_fields.load(Ordering::Relaxed),
            extra_fields: self.extra_fields.load(Ordering::Relaxed),
            assignments: self.assignments.load(Ordering::Relaxed),
            assignments_rejected: self.assignments_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_validated: u64,
    pub records_rejected: u64,
    pub coercion_failures: u64,
    pub constraint_failures: u64,
    pub model_failures: u64,
    pub missing_fields: u64,
    pub extra_fields: u64,
    pub assignments: u64,
    pub assignments_rejected: u64,
}
