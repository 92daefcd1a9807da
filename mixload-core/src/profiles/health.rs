use rand::{Rng as _, RngCore};

use crate::check::Check;
use crate::error::{Error, Result};
use crate::profile::{ProfileRequest, RequestBuilder};

const OK_CHECK: Check = Check::new("health status 200", 200);
const ERROR_CHECK: Check = Check::new("health error produced", 500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthOptions {
    /// Share of health requests (0..=100) sent with `test_error=true`.
    pub error_percent: u8,
}

/// `GET /health`, optionally mixed with the server's deliberate error path.
#[derive(Debug, Clone, Copy)]
pub struct HealthProfile {
    error_percent: u8,
}

impl HealthProfile {
    pub fn new(opts: HealthOptions) -> Result<Self> {
        if opts.error_percent > 100 {
            return Err(Error::invalid(
                "health_error_percent",
                format!("must be within 0..=100 (got {})", opts.error_percent),
            ));
        }
        Ok(Self {
            error_percent: opts.error_percent,
        })
    }

    fn error_branch(&self, rng: &mut dyn RngCore) -> bool {
        self.error_percent > 0 && rng.gen_range(0..100u8) < self.error_percent
    }
}

impl RequestBuilder for HealthProfile {
    fn build(&self, rng: &mut dyn RngCore) -> ProfileRequest {
        let (path, check) = if self.error_branch(rng) {
            ("/health?test_error=true", ERROR_CHECK)
        } else {
            ("/health", OK_CHECK)
        };
        ProfileRequest::get(path, check)
    }

    fn checks(&self) -> Vec<Check> {
        if self.error_percent > 0 {
            vec![OK_CHECK, ERROR_CHECK]
        } else {
            vec![OK_CHECK]
        }
    }
}
