//! # Migration job entity.
//!
//! A job is selected by a polling/scheduling layer outside this crate and
//! handed to the controller, which guarantees exclusive execution for it.
//! The controller itself only needs the stable id; the parameter map is
//! opaque payload for migrator implementations.

use std::collections::HashMap;
use std::sync::Arc;

/// One discrete, idempotent-by-design unit of migration work.
#[derive(Clone, Debug)]
pub struct MigrationJob {
    job_id: Arc<str>,
    parameters: HashMap<String, String>,
}

impl MigrationJob {
    /// Creates a job with the given stable, non-empty identifier.
    pub fn new(job_id: impl Into<Arc<str>>) -> Self {
        Self {
            job_id: job_id.into(),
            parameters: HashMap::new(),
        }
    }

    /// Attaches a free-form parameter for the migrator implementation.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Stable identifier of this job.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Looks up a free-form parameter.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_parameters() {
        let job = MigrationJob::new("job-5").with_parameter("entity", "users");
        assert_eq!(job.job_id(), "job-5");
        assert_eq!(job.parameter("entity"), Some("users"));
        assert_eq!(job.parameter("other"), None);
    }
}
