use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_ENTRY_POINT;

pub const ENTRY_POINT_VAR: &str = "SOLUTION_RUNNER_ENTRY_POINT";
pub const TIME_LIMIT_VAR: &str = "SOLUTION_RUNNER_TIME_LIMIT_MS";
pub const STACK_SIZE_VAR: &str = "SOLUTION_RUNNER_STACK_SIZE";
pub const STDLIB_PATH_VAR: &str = "SOLUTION_RUNNER_STDLIB_PATH";

const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(10);
const DEFAULT_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Host locations that may hold a pure-Python standard library.
const STDLIB_CANDIDATES: [&str; 9] = [
    "/usr/local/lib/python3.13",
    "/usr/local/lib/python3.12",
    "/usr/local/lib/python3.11",
    "/usr/local/lib/python3.10",
    "/usr/lib/python3",
    "/usr/lib/python3.13",
    "/usr/lib/python3.12",
    "/usr/lib/python3.11",
    "/usr/lib/python3.10",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Name of the callable invoked once per test case.
    pub entry_point: String,
    /// Wall-clock budget for one execution. `None` waits forever.
    pub time_limit: Option<Duration>,
    pub worker_stack_size: usize,
    /// Directories added to the interpreter's module search path.
    pub stdlib_paths: Vec<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            time_limit: Some(DEFAULT_TIME_LIMIT),
            worker_stack_size: DEFAULT_STACK_SIZE,
            stdlib_paths: host_stdlib_paths(),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the known variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(entry_point) = lookup(ENTRY_POINT_VAR) {
            let entry_point = entry_point.trim();
            if entry_point.is_empty() {
                return Err(ConfigError::Empty {
                    var: ENTRY_POINT_VAR,
                });
            }
            settings.entry_point = entry_point.to_string();
        }

        if let Some(value) = lookup(TIME_LIMIT_VAR) {
            settings.time_limit = match parse_number(TIME_LIMIT_VAR, &value)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            };
        }

        if let Some(value) = lookup(STACK_SIZE_VAR) {
            let size = parse_number(STACK_SIZE_VAR, &value)?;
            settings.worker_stack_size =
                usize::try_from(size).map_err(|_| ConfigError::InvalidNumber {
                    var: STACK_SIZE_VAR,
                    value: value.clone(),
                })?;
        }

        if let Some(value) = lookup(STDLIB_PATH_VAR) {
            settings.stdlib_paths = value
                .split(':')
                .filter(|part| !part.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        Ok(settings)
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}

fn host_stdlib_paths() -> Vec<PathBuf> {
    STDLIB_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.is_dir())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<EngineSettings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineSettings::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.entry_point, "solution");
        assert_eq!(settings.time_limit, Some(Duration::from_secs(10)));
        assert_eq!(settings.worker_stack_size, 256 * 1024 * 1024);
        assert!(settings.stdlib_paths.iter().all(|path| path.is_dir()));
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            (ENTRY_POINT_VAR, "solve"),
            (TIME_LIMIT_VAR, "2500"),
            (STACK_SIZE_VAR, "1048576"),
            (STDLIB_PATH_VAR, "/opt/py/lib::/srv/lib"),
        ])
        .unwrap();

        assert_eq!(settings.entry_point, "solve");
        assert_eq!(settings.time_limit, Some(Duration::from_millis(2500)));
        assert_eq!(settings.worker_stack_size, 1_048_576);
        assert_eq!(
            settings.stdlib_paths,
            vec![PathBuf::from("/opt/py/lib"), PathBuf::from("/srv/lib")]
        );
    }

    #[test]
    fn test_zero_time_limit_disables_it() {
        let settings = settings_from(&[(TIME_LIMIT_VAR, "0")]).unwrap();
        assert_eq!(settings.time_limit, None);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            settings_from(&[(TIME_LIMIT_VAR, "soon")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: TIME_LIMIT_VAR,
                value: "soon".to_string()
            }
        );
        assert!(settings_from(&[(STACK_SIZE_VAR, "-1")]).is_err());
        assert_eq!(
            settings_from(&[(ENTRY_POINT_VAR, "  ")]).unwrap_err(),
            ConfigError::Empty {
                var: ENTRY_POINT_VAR
            }
        );
    }
}
