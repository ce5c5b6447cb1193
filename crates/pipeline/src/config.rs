use std::time::Duration;

/// Default StopFlag polling interval of long-running stage bodies.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 1000;

/// Default number of progress steps of long-running stage bodies.
pub const DEFAULT_PROGRESS_STEPS: u32 = 10;

/// Default capacity of the engine request channel.
pub const DEFAULT_REQUEST_CAPACITY: usize = 64;

/// Name given to designs created implicitly by entry stages.
pub const DEFAULT_DESIGN_NAME: &str = "noname";

/// Engine configuration loaded from environment variables.
///
/// All fields have defaults matching the interactive product behaviour.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between progress steps; also the stop polling granularity.
    pub step_interval: Duration,
    /// Progress steps of synthesis and global placement.
    pub progress_steps: u32,
    /// Event bus capacity.
    pub event_capacity: usize,
    /// Engine request channel capacity.
    pub request_capacity: usize,
    /// Name used when `ipgenerate` / `synthesize` auto-create a design.
    pub default_design: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(DEFAULT_STEP_INTERVAL_MS),
            progress_steps: DEFAULT_PROGRESS_STEPS,
            event_capacity: fabflow_events::bus::DEFAULT_CAPACITY,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            default_design: DEFAULT_DESIGN_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default  |
    /// |----------------------------|----------|
    /// | `FABFLOW_STEP_INTERVAL_MS` | `1000`   |
    /// | `FABFLOW_PROGRESS_STEPS`   | `10`     |
    /// | `FABFLOW_EVENT_CAPACITY`   | `1024`   |
    /// | `FABFLOW_REQUEST_CAPACITY` | `64`     |
    /// | `FABFLOW_DEFAULT_DESIGN`   | `noname` |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let step_interval = env_parse("FABFLOW_STEP_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.step_interval);

        let progress_steps = env_parse("FABFLOW_PROGRESS_STEPS")
            .filter(|&steps: &u32| steps > 0)
            .unwrap_or(defaults.progress_steps);

        let event_capacity = env_parse("FABFLOW_EVENT_CAPACITY")
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.event_capacity);

        let request_capacity = env_parse("FABFLOW_REQUEST_CAPACITY")
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.request_capacity);

        let default_design = std::env::var("FABFLOW_DEFAULT_DESIGN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_design);

        Self {
            step_interval,
            progress_steps,
            event_capacity,
            request_capacity,
            default_design,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_interactive_behaviour() {
        let config = EngineConfig::default();
        assert_eq!(config.step_interval, Duration::from_secs(1));
        assert_eq!(config.progress_steps, 10);
        assert_eq!(config.default_design, "noname");
    }
}
