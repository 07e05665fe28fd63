//! Application constants

/// Maximum tweet length in characters (platform limit)
pub const MAX_TWEET_LENGTH: usize = 280;

/// Default page size for paginated list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum page size for paginated list endpoints
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default trailing window for analytics queries, in days
pub const DEFAULT_ANALYTICS_DAYS: i64 = 30;

/// Maximum number of tweets polled per metrics refresh cycle
pub const DEFAULT_METRICS_BATCH_SIZE: i64 = 100;

/// Only tweets posted within this many days get metrics refreshed
pub const DEFAULT_METRICS_WINDOW_DAYS: i64 = 7;

/// Default number of AI variants per generation request
pub const DEFAULT_VARIANT_COUNT: usize = 3;

/// Maximum number of AI variants per generation request
pub const MAX_VARIANT_COUNT: usize = 5;
