//! Lottery metrics collection
//!
//! Counters live in a private prometheus registry owned by the engine and are
//! rendered in the text exposition format on demand. With export disabled the
//! counters still count but are never registered, so `render` yields nothing.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::errors::{ConfigurationError, LotteryResult};

pub struct LotteryMetrics {
    registry: Registry,
    pub draws_created: IntCounter,
    pub draws_executed: IntCounter,
    pub draws_cancelled: IntCounter,
    pub tickets_issued: IntCounter,
    pub tickets_submitted: IntCounter,
    pub submission_conflicts: IntCounter,
    pub awards_created: IntCounter,
    pub redemptions: IntCounter,
    pub settlement_runs: IntCounter,
    /// Failed operations by stable error code
    pub operation_errors: IntCounterVec,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub draws_created: u64,
    pub draws_executed: u64,
    pub tickets_submitted: u64,
    pub submission_conflicts: u64,
    pub awards_created: u64,
    pub redemptions: u64,
}

fn counter(registry: Option<&Registry>, name: &str, help: &str) -> LotteryResult<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help).namespace("fairdraw"))?;
    if let Some(registry) = registry {
        registry.register(Box::new(counter.clone()))?;
    }
    Ok(counter)
}

impl LotteryMetrics {
    /// Counters registered for export
    pub fn new() -> LotteryResult<Self> {
        Self::build(true)
    }

    /// Counters kept in process only; `render` returns an empty exposition
    pub fn unexported() -> LotteryResult<Self> {
        Self::build(false)
    }

    fn build(export: bool) -> LotteryResult<Self> {
        let registry = Registry::new();
        let target = export.then_some(&registry);

        let operation_errors = IntCounterVec::new(
            Opts::new("operation_errors_total", "Failed operations by error code").namespace("fairdraw"),
            &["code"],
        )?;
        if let Some(registry) = target {
            registry.register(Box::new(operation_errors.clone()))?;
        }

        Ok(Self {
            draws_created: counter(target, "draws_created_total", "Draws created")?,
            draws_executed: counter(target, "draws_executed_total", "Draws executed and settled")?,
            draws_cancelled: counter(target, "draws_cancelled_total", "Draws cancelled")?,
            tickets_issued: counter(target, "tickets_issued_total", "Tickets issued")?,
            tickets_submitted: counter(target, "tickets_submitted_total", "Tickets submitted")?,
            submission_conflicts: counter(
                target,
                "submission_conflicts_total",
                "Submissions rejected because the ticket was already submitted",
            )?,
            awards_created: counter(target, "awards_created_total", "Prize awards created")?,
            redemptions: counter(target, "redemptions_total", "Prize awards redeemed")?,
            settlement_runs: counter(target, "settlement_runs_total", "Settlement passes over a draw")?,
            operation_errors,
            registry,
        })
    }

    pub fn record_error(&self, code: &str) {
        self.operation_errors.with_label_values(&[code]).inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            draws_created: self.draws_created.get(),
            draws_executed: self.draws_executed.get(),
            tickets_submitted: self.tickets_submitted.get(),
            submission_conflicts: self.submission_conflicts.get(),
            awards_created: self.awards_created.get(),
            redemptions: self.redemptions.get(),
        }
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> LotteryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ConfigurationError::Metrics(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_counters() {
        let metrics = LotteryMetrics::new().unwrap();
        metrics.tickets_submitted.inc();
        metrics.record_error("TicketAlreadySubmittedConflict");

        let text = metrics.render().unwrap();
        assert!(text.contains("fairdraw_tickets_submitted_total 1"));
        assert!(text.contains("code=\"TicketAlreadySubmittedConflict\""));
        assert_eq!(metrics.snapshot().tickets_submitted, 1);
    }

    #[test]
    fn test_unexported_metrics_render_nothing() {
        let metrics = LotteryMetrics::unexported().unwrap();
        metrics.tickets_submitted.inc();
        metrics.record_error("DrawNotFound");

        assert!(metrics.render().unwrap().is_empty());
        assert_eq!(metrics.snapshot().tickets_submitted, 1);
    }
}
