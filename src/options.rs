use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total number of HTTP attempts for one logical call, including the first.
    pub max_attempts: u32,
    /// Base backoff in milliseconds, doubled for each attempt index.
    pub backoff_base_ms: u64,
}

impl ClientOptions {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_attempts: 3,
            backoff_base_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientOptions;

    #[test]
    fn defaults_allow_three_attempts_with_two_second_base() {
        let opts = ClientOptions::default();
        assert_eq!(opts.max_attempts, 3);
        assert_eq!(opts.backoff_base(), Duration::from_secs(2));
        assert_eq!(opts.timeout(), Duration::from_secs(30));
    }
}
