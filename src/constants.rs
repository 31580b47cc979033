//! Constants used throughout the application
//!
//! This module centralizes magic strings and limit values so the engine,
//! codec, and config layers agree on them.

/// Namespace tag for the metadata marker embedded in remote notes fields.
pub const METADATA_NAMESPACE: &str = "TASKMIRROR";

/// Current version of the metadata side-channel format.
pub const METADATA_VERSION: &str = "v1";

/// Prefix generated locally for tasks that do not have a remote id yet.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Default base URL for the remote task service REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://tasks.googleapis.com/tasks/v1";

/// Default environment variable holding the API token for an account.
pub const DEFAULT_API_TOKEN_ENV: &str = "TASKMIRROR_API_TOKEN";

// Config validation bounds
pub const AUTO_REFRESH_MAX_MINUTES: u64 = 1440;
pub const HTTP_TIMEOUT_MIN_SECONDS: u64 = 1;
pub const HTTP_TIMEOUT_MAX_SECONDS: u64 = 300;
