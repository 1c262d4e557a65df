//! Periodic evaluation driver.
//!
//! Each pass runs to completion before the next tick is awaited, and ticks that
//! fall due while a pass is still running are skipped, so passes never overlap.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::{RuleResolver, StateEvaluator, TickReport};
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub struct TickDriver {
    period: Duration,
    max_ticks: Option<u64>,
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            max_ticks: None,
        }
    }

    /// Stop after `ticks` passes.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Evaluate `graph` once per period until the tick budget is spent or
    /// `on_tick` breaks. Returns the number of passes run.
    pub async fn run<R, F>(&self, evaluator: &StateEvaluator<R>, graph: &Graph, mut on_tick: F) -> u64
    where
        R: RuleResolver,
        F: FnMut(&TickReport) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut passes = 0;
        while self.max_ticks.map_or(true, |max| passes < max) {
            interval.tick().await;

            let report = evaluator.tick(graph);
            passes += 1;
            tracing::debug!(
                "Tick {}: {} of {} nodes on",
                passes,
                report.active_count(),
                report.states.len()
            );

            if on_tick(&report).is_break() {
                break;
            }
        }
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_budgeted_ticks() {
        let driver = TickDriver::new(Duration::from_millis(5)).with_max_ticks(3);
        let evaluator = StateEvaluator::default();
        let graph = Graph::new();

        let mut seen = 0;
        let passes = driver
            .run(&evaluator, &graph, |_| {
                seen += 1;
                ControlFlow::Continue(())
            })
            .await;

        assert_eq!(passes, 3);
        assert_eq!(seen, 3);
    }

    #[tokio::test]
    async fn test_callback_can_stop() {
        let driver = TickDriver::new(Duration::from_millis(1));
        let evaluator = StateEvaluator::default();
        let graph = Graph::new();

        let passes = driver.run(&evaluator, &graph, |_| ControlFlow::Break(())).await;
        assert_eq!(passes, 1);
    }

    #[test]
    fn test_zero_period_is_clamped() {
        assert_eq!(TickDriver::new(Duration::ZERO).period(), Duration::from_millis(1));
    }
}
