// =============================================================================
// Environment Variables - Control Plane Connection
// =============================================================================

/// Environment variable for the worker's bus endpoint
pub const ENV_ENDPOINT: &str = "GITHOOK_ENDPOINT";

/// Environment variable for the control-plane API base URL
pub const ENV_API_BASE_URL: &str = "GITHOOK_API_BASE_URL";

/// Environment variable for the control-plane API key
pub const ENV_API_KEY: &str = "GITHOOK_API_KEY";

/// Environment variable for the tenant id header
pub const ENV_TENANT_ID: &str = "GITHOOK_TENANT_ID";

/// Environment variable for the OAuth2 token URL
pub const ENV_OAUTH2_TOKEN_URL: &str = "GITHOOK_OAUTH2_TOKEN_URL";

/// Environment variable for the OAuth2 client id
pub const ENV_OAUTH2_CLIENT_ID: &str = "GITHOOK_OAUTH2_CLIENT_ID";

/// Environment variable for the OAuth2 client secret
pub const ENV_OAUTH2_CLIENT_SECRET: &str = "GITHOOK_OAUTH2_CLIENT_SECRET";

/// Environment variable for the OAuth2 scopes (space separated)
pub const ENV_OAUTH2_SCOPES: &str = "GITHOOK_OAUTH2_SCOPES";

/// Environment variable for the OAuth2 audience
pub const ENV_OAUTH2_AUDIENCE: &str = "GITHOOK_OAUTH2_AUDIENCE";

// =============================================================================
// Defaults
// =============================================================================

/// Default control-plane HTTP timeout
pub const DEFAULT_CONTROL_PLANE_TIMEOUT_SECS: u64 = 10;

/// Default handler concurrency when unset or non-positive
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default total attempts is `retry_count + 1`; default retry_count
pub const DEFAULT_RETRY_COUNT: u32 = 0;

/// Refresh OAuth2 tokens this many seconds before they expire
pub const OAUTH2_REFRESH_SKEW_SECS: i64 = 30;

/// Default escape-hatch timeout for composite subscriber shutdown join
pub const DEFAULT_SHUTDOWN_JOIN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Metadata Keys (canonical)
// =============================================================================

pub const METADATA_PROVIDER: &str = "provider";
pub const METADATA_EVENT: &str = "event";
pub const METADATA_REQUEST_ID: &str = "request_id";
pub const METADATA_INSTALLATION_ID: &str = "installation_id";
pub const METADATA_LOG_ID: &str = "log_id";
pub const METADATA_PROVIDER_INSTANCE_KEY: &str = "provider_instance_key";
pub const METADATA_DRIVER: &str = "driver";

// =============================================================================
// Drivers
// =============================================================================

/// The only driver name for which the retry decision is translated into a
/// bus-level requeue signal (see `Worker::requeue_flag`).
pub const REQUEUE_HONORING_DRIVER: &str = "amqp";

// =============================================================================
// Event Log Statuses
// =============================================================================

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";

// =============================================================================
// Control Plane RPC Paths
// =============================================================================

pub const PATH_LIST_RULES: &str = "/cloud.v1.RulesService/ListRules";
pub const PATH_GET_RULE: &str = "/cloud.v1.RulesService/GetRule";
pub const PATH_LIST_DRIVERS: &str = "/cloud.v1.DriversService/ListDrivers";
pub const PATH_UPDATE_EVENT_LOG_STATUS: &str = "/cloud.v1.EventLogsService/UpdateEventLogStatus";
pub const PATH_GET_SCM_CLIENT: &str = "/cloud.v1.SCMService/GetSCMClient";
