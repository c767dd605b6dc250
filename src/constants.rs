/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const CONFIG_ENV_PREFIX: &str = "GENIE_";

// Timeouts
pub const TURN_TIMEOUT_SECS: u64 = 60;
pub const AVATAR_TIMEOUT_SECS: u64 = 10;
pub const HEALTH_TIMEOUT_SECS: u64 = 3;
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

// Transient notifications
pub const NOTIFICATION_DURATION_MS: u64 = 3000;
pub const NOTIFICATION_FADE_MS: u64 = 500;

// User-facing messages
pub const TIMEOUT_MESSAGE: &str =
    "Request timeout. The Lox Genie is taking too long to respond. Please try again.";
pub const UNREACHABLE_MESSAGE: &str =
    "Cannot connect to Lox Genie API. Make sure the API service is running.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "I'm sorry, I couldn't generate a response at the moment. Please try again.";
pub const TURN_SERVER_ERROR_MESSAGE: &str =
    "The agent encountered an error. Please try rephrasing your question.";
pub const WISH_SERVER_ERROR_MESSAGE: &str = "Failed to generate wish. Please try again.";
pub const VERIFY_TRANSPORT_FAILURE_MESSAGE: &str =
    "Failed to verify username. Please check your connection.";
pub const VERIFIED_MESSAGE: &str = "Username verified!";
