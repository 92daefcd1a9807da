use serde::Serialize;

use crate::engine::{EngineResponse, NetworkError};

/// A named pass/fail predicate over the response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub expect_status: u16,
}

impl Check {
    pub const fn new(name: &'static str, expect_status: u16) -> Self {
        Self {
            name,
            expect_status,
        }
    }

    #[must_use]
    pub fn passes(&self, status: u16) -> bool {
        status == self.expect_status
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckEvaluator;

impl CheckEvaluator {
    /// A request that never produced a response fails its check.
    #[must_use]
    pub fn evaluate(
        &self,
        check: &Check,
        outcome: &std::result::Result<EngineResponse, NetworkError>,
    ) -> bool {
        match outcome {
            Ok(res) => check.passes(res.status),
            Err(_) => false,
        }
    }
}
