#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed. Failed checks are reported, not fatal.
    Success = 0,

    /// Invalid CLI/env/config input (bad flags, weights, stages, base URL, etc.).
    InvalidInput = 30,

    /// The workload could not be executed (results file, VU failure, runtime errors).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
