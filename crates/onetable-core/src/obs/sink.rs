//! Metrics sink boundary.
//!
//! Table operations report through `MetricsEvent` values only. The sink is
//! chosen per table at setup; there is no process-wide metrics state.

use crate::error::Operation;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    OpStart {
        op: Operation,
        type_name: &'a str,
    },
    OpFinish {
        op: Operation,
        type_name: &'a str,
        ok: bool,
        items: u64,
    },
    IndexSelected {
        type_name: &'a str,
        /// Empty for the primary index.
        index: &'a str,
    },
    UniqueProbe {
        type_name: &'a str,
        limit: u32,
        items: u64,
    },
    UniqueViolation {
        type_name: &'a str,
    },
    TokenRejected {
        type_name: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// NoopSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record(&self, _: MetricsEvent<'_>) {}
}

///
/// CounterSink
///
/// Lock-free counters; `report` takes a point-in-time snapshot.
///

#[derive(Debug, Default)]
pub struct CounterSink {
    creates: AtomicU64,
    reads: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    lists: AtomicU64,
    failures: AtomicU64,
    items_listed: AtomicU64,
    primary_selections: AtomicU64,
    secondary_selections: AtomicU64,
    unique_probes: AtomicU64,
    unique_items_inspected: AtomicU64,
    unique_violations: AtomicU64,
    tokens_rejected: AtomicU64,
}

impl CounterSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> MetricsReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsReport {
            creates: load(&self.creates),
            reads: load(&self.reads),
            updates: load(&self.updates),
            deletes: load(&self.deletes),
            lists: load(&self.lists),
            failures: load(&self.failures),
            items_listed: load(&self.items_listed),
            primary_selections: load(&self.primary_selections),
            secondary_selections: load(&self.secondary_selections),
            unique_probes: load(&self.unique_probes),
            unique_items_inspected: load(&self.unique_items_inspected),
            unique_violations: load(&self.unique_violations),
            tokens_rejected: load(&self.tokens_rejected),
        }
    }

    const fn op_counter(&self, op: Operation) -> &AtomicU64 {
        match op {
            Operation::Create => &self.creates,
            Operation::Read => &self.reads,
            Operation::Update => &self.updates,
            Operation::Delete => &self.deletes,
            Operation::List => &self.lists,
        }
    }
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl MetricsSink for CounterSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::OpStart { op, .. } => bump(self.op_counter(op), 1),
            MetricsEvent::OpFinish { op, ok, items, .. } => {
                if !ok {
                    bump(&self.failures, 1);
                }
                if op == Operation::List {
                    bump(&self.items_listed, items);
                }
            }
            MetricsEvent::IndexSelected { index, .. } => {
                if index.is_empty() {
                    bump(&self.primary_selections, 1);
                } else {
                    bump(&self.secondary_selections, 1);
                }
            }
            MetricsEvent::UniqueProbe { items, .. } => {
                bump(&self.unique_probes, 1);
                bump(&self.unique_items_inspected, items);
            }
            MetricsEvent::UniqueViolation { .. } => bump(&self.unique_violations, 1),
            MetricsEvent::TokenRejected { .. } => bump(&self.tokens_rejected, 1),
        }
    }
}

///
/// MetricsReport
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct MetricsReport {
    pub creates: u64,
    pub reads: u64,
    pub updates: u64,
    pub deletes: u64,
    pub lists: u64,
    pub failures: u64,
    pub items_listed: u64,
    pub primary_selections: u64,
    pub secondary_selections: u64,
    pub unique_probes: u64,
    pub unique_items_inspected: u64,
    pub unique_violations: u64,
    pub tokens_rejected: u64,
}

///
/// TESTS
///
