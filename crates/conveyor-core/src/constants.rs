//! Application-wide constants.

/// Service name reported by the health endpoint and telemetry.
pub const SERVICE_NAME: &str = "file-upload-service";
