use super::{match_request, Expectation, PlanError, Planner};
use crate::expectation::Repeat;
use crate::request::Request;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Matches requests strictly in declaration order.
///
/// Only the head of the queue is considered. A request that does not match it
/// fails without advancing the queue.
#[derive(Default)]
pub struct Sequence {
    expectations: Mutex<VecDeque<Arc<dyn Expectation>>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Create the default sequential planner.
pub fn sequence() -> Sequence {
    Sequence::new()
}

impl Planner for Sequence {
    fn is_empty(&self) -> bool {
        self.expectations.lock().is_empty()
    }

    fn expect(&self, expectation: Arc<dyn Expectation>) {
        self.expectations.lock().push_back(expectation);
    }

    fn plan(&self, request: &mut Request) -> Result<Arc<dyn Expectation>, PlanError> {
        let mut expectations = self.expectations.lock();

        let expected = expectations.front().cloned().ok_or(PlanError::Exhausted)?;

        match_request(expected.as_ref(), request)?;

        let keep = match expected.remain_times() {
            Repeat::Unlimited => true,
            Repeat::Times(n) => n > 1,
        };

        if !keep {
            expectations.pop_front();
        }

        expected.fulfilled();

        debug!(
            method = %expected.method(),
            uri = %expected.uri_matcher().expected(),
            retired = !keep,
            "planned request"
        );

        Ok(expected)
    }

    fn remain(&self) -> Vec<Arc<dyn Expectation>> {
        self.expectations.lock().iter().cloned().collect()
    }

    fn reset(&self) {
        self.expectations.lock().clear();
    }
}
