//! Runtime configuration

use serde::Deserialize;

use crate::Result;

/// Default endpoint the confirmation trigger calls.
pub const DEFAULT_CONFIRM_PATH: &str = "/split/confirm_human/";

/// Default cap on enrollments shown in an activity log.
pub const DEFAULT_ACTIVITY_LOG_LIMIT: usize = 1000;

/// Split-testing configuration.
///
/// # Example
///
/// ```rust
/// use splitdb::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .first_visit_goal("landed")
///     .confirm_path("/ab/confirm/")
///     .build();
/// assert_eq!(config.first_visit_goal(), Some("landed"));
///
/// let config = SplitConfig::from_json(r#"{"first_visit_goal": "landed"}"#).unwrap();
/// assert_eq!(config.confirm_path(), "/split/confirm_human/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    first_visit_goal: Option<String>,
    confirm_path: String,
    activity_log_limit: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            first_visit_goal: None,
            confirm_path: DEFAULT_CONFIRM_PATH.to_string(),
            activity_log_limit: DEFAULT_ACTIVITY_LOG_LIMIT,
        }
    }
}

impl SplitConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder::default()
    }

    /// Parse a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Serialization`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Goal logged automatically on a visitor's first visit.
    #[must_use]
    pub fn first_visit_goal(&self) -> Option<&str> {
        self.first_visit_goal.as_deref()
    }

    /// Endpoint the injected confirmation trigger requests.
    #[must_use]
    pub fn confirm_path(&self) -> &str {
        &self.confirm_path
    }

    /// Cap on enrollments shown in an activity log.
    #[must_use]
    pub const fn activity_log_limit(&self) -> usize {
        self.activity_log_limit
    }
}

/// Builder for [`SplitConfig`]
#[derive(Debug, Default)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    /// Log this goal when a first visit is detected
    #[must_use]
    pub fn first_visit_goal(mut self, goal: impl Into<String>) -> Self {
        self.config.first_visit_goal = Some(goal.into());
        self
    }

    /// Set the confirmation endpoint
    #[must_use]
    pub fn confirm_path(mut self, path: impl Into<String>) -> Self {
        self.config.confirm_path = path.into();
        self
    }

    /// Set the activity log cap
    #[must_use]
    pub const fn activity_log_limit(mut self, limit: usize) -> Self {
        self.config.activity_log_limit = limit;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> SplitConfig {
        self.config
    }
}
