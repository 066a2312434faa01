//! Error types for the ordering probe.

use thiserror::Error;

/// Fatal setup-phase failures. Ordering mismatches observed during the run
/// are a measurement, not an error, and never appear here.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("aligned allocation failed for {region}: {reason}")]
    Allocation {
        region: &'static str,
        reason: String,
    },

    #[error("failed to spawn {role} thread")]
    ThreadSpawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_error_names_the_region() {
        let err = HarnessError::Allocation {
            region: "flag",
            reason: "allocator returned null".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "aligned allocation failed for flag: allocator returned null"
        );
    }

    #[test]
    fn spawn_error_carries_the_io_source() {
        let err = HarnessError::ThreadSpawn {
            role: "writer",
            source: std::io::Error::from(std::io::ErrorKind::WouldBlock),
        };
        assert_eq!(err.to_string(), "failed to spawn writer thread");
        assert!(std::error::Error::source(&err).is_some());
    }
}
