use dispatch_domain::entities::{ExecutionStatus, ResourceLimits};
use dispatch_domain::error::Error;
use std::str::FromStr;

#[test]
fn resource_limits_defaults_match_the_execution_platform() {
    let limits = ResourceLimits::default();
    assert_eq!(limits.cpu_limit, "4");
    assert_eq!(limits.memory_limit, "8Gi");
    assert_eq!(limits.cpu_request, "2");
    assert_eq!(limits.memory_request, "4Gi");
    assert_eq!(limits.disk_limit, "10Gi");
    assert_eq!(limits.timeout_seconds, 300);
}

#[test]
fn execution_status_round_trips_through_str() {
    for (text, status) in [
        ("success", ExecutionStatus::Success),
        ("FAILED", ExecutionStatus::Failed),
        ("Timeout", ExecutionStatus::Timeout),
        ("rejected", ExecutionStatus::Rejected),
        ("error", ExecutionStatus::Error),
    ] {
        assert_eq!(ExecutionStatus::from_str(text).unwrap(), status);
    }
    assert!(ExecutionStatus::from_str("bogus").is_err());
}

#[test]
fn only_transient_conditions_are_retryable() {
    assert!(Error::transient("connection reset").is_retryable());
    assert!(Error::network("dns lookup failed").is_retryable());
    assert!(!Error::timeout(30).is_retryable());
    assert!(!Error::sandbox_failure("non-zero exit").is_retryable());
    assert!(!Error::validation("file i/o is prohibited").is_retryable());
}
