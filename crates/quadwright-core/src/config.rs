//! # Session Configuration
//!
//! Deployment settings for a `Session`. Every field has a default, so an
//! empty TOML document is a valid configuration:
//!
//! ```toml
//! quads = true
//! cluster = false
//! buffer_capacity = 10000
//! writer_threads = 2
//! disabled_updates = ["load"]
//! ```

use crate::UpdateError;
use crate::primitives::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_LEXICON_NAMESPACE, DEFAULT_NAMESPACE, DEFAULT_WRITER_THREADS,
};
use crate::update::UpdateKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Store mode for newly created stores.
    pub quads: bool,
    /// Commit is managed by the cluster layer, not by update sequences.
    pub cluster: bool,
    /// Whether graph copies carry inferred statements along.
    pub include_inferred: bool,
    pub namespace: String,
    pub lexicon_namespace: String,
    /// Default capacity of assertion buffers.
    pub buffer_capacity: usize,
    /// Threads in the session's writer pool.
    pub writer_threads: usize,
    /// Update kinds this deployment refuses.
    pub disabled_updates: Vec<UpdateKind>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quads: true,
            cluster: false,
            include_inferred: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            lexicon_namespace: DEFAULT_LEXICON_NAMESPACE.to_string(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            writer_threads: DEFAULT_WRITER_THREADS,
            disabled_updates: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Reject settings no session can run with.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.buffer_capacity == 0 {
            return Err(UpdateError::PreconditionViolation(
                "buffer_capacity must be positive".to_string(),
            ));
        }
        if self.writer_threads == 0 {
            return Err(UpdateError::PreconditionViolation(
                "writer_threads must be positive".to_string(),
            ));
        }
        if self.namespace.is_empty() {
            return Err(UpdateError::PreconditionViolation(
                "namespace must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        assert!(config.quads);
        assert!(!config.cluster);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        config.validate().expect("defaults validate");
    }

    #[test]
    fn zero_sizes_rejected() {
        let config = SessionConfig {
            writer_threads: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            buffer_capacity: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
