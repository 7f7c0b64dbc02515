use std::time::Duration;

/// Runtime options handed from the front end into the probing layers.
pub struct Config {
    /// Signal class the wiring graph is restricted to.
    pub signal_class: String,

    /// Deadline for each per-hop ActiveSignal request.
    pub probe_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signal_class: "video".to_string(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}
