use crate::auth::JwtConfig;
use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;

/// Tuning for assignment, the reaper and the ledger outbox
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ASSIGNMENT_RADIUS_KM | 5 | Search radius around the delivery address |
/// | ASSIGNMENT_RETRY_SECS | 30 | How long a shipper has to accept an offer |
/// | ASSIGNMENT_MAX_ATTEMPTS | 10 | Offers before the task is dead-lettered |
/// | ASSIGNMENT_TICK_SECS | 5 | How often due offers are checked |
/// | PENDING_DELIVERY_TTL_SECS | 600 | Lifetime of an assignment record |
/// | REAPER_INTERVAL_SECS | 60 | Stuck-order sweep interval |
/// | REAPER_GRACE_SECS | 180 | Age before an unaccepted order is canceled |
/// | LEDGER_RETRY_SCAN_SECS | 30 | Outbox rescan interval |
#[derive(Debug, Clone)]
pub struct FulfillmentConfig {
    pub assignment_radius_km: f64,
    pub assignment_retry: Duration,
    pub assignment_max_attempts: u32,
    pub assignment_tick: Duration,
    pub pending_delivery_ttl: Duration,
    pub reaper_interval: Duration,
    pub reaper_grace: Duration,
    pub ledger_retry_scan: Duration,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            assignment_radius_km: 5.0,
            assignment_retry: Duration::from_secs(30),
            assignment_max_attempts: 10,
            assignment_tick: Duration::from_secs(5),
            pending_delivery_ttl: Duration::from_secs(600),
            reaper_interval: Duration::from_secs(60),
            reaper_grace: Duration::from_secs(180),
            ledger_retry_scan: Duration::from_secs(30),
        }
    }
}

impl FulfillmentConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            assignment_radius_km: env_or("ASSIGNMENT_RADIUS_KM", defaults.assignment_radius_km),
            assignment_retry: env_secs("ASSIGNMENT_RETRY_SECS", defaults.assignment_retry),
            assignment_max_attempts: env_or(
                "ASSIGNMENT_MAX_ATTEMPTS",
                defaults.assignment_max_attempts,
            ),
            assignment_tick: env_secs("ASSIGNMENT_TICK_SECS", defaults.assignment_tick),
            pending_delivery_ttl: env_secs(
                "PENDING_DELIVERY_TTL_SECS",
                defaults.pending_delivery_ttl,
            ),
            reaper_interval: env_secs("REAPER_INTERVAL_SECS", defaults.reaper_interval),
            reaper_grace: env_secs("REAPER_GRACE_SECS", defaults.reaper_grace),
            ledger_retry_scan: env_secs("LEDGER_RETRY_SCAN_SECS", defaults.ledger_retry_scan),
        }
    }
}

/// Server configuration
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Database and log location |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | ENVIRONMENT | development | development, staging or production |
/// | BUSINESS_TIMEZONE | Asia/Ho_Chi_Minh | Sale windows and business days |
/// | LOG_LEVEL | info | Default filter when RUST_LOG is unset |
/// | LOG_DIR | (none) | Enables daily rolling log files |
/// | LOG_JSON | false | JSON log lines |
/// | PUSH_GATEWAY_URL | (none) | Push delivery endpoint; logs only when unset |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    pub environment: String,
    pub timezone: Tz,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    pub jwt: JwtConfig,
    pub push_gateway_url: Option<String>,
    pub fulfillment: FulfillmentConfig,
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let timezone = std::env::var("BUSINESS_TIMEZONE")
            .ok()
            .and_then(|tz| match tz.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(e) => {
                    tracing::warn!(timezone = %tz, error = %e, "Invalid BUSINESS_TIMEZONE, using default");
                    None
                }
            })
            .unwrap_or(chrono_tz::Asia::Ho_Chi_Minh);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_or("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            log_json: env_or("LOG_JSON", false),
            jwt: JwtConfig::from_env(),
            push_gateway_url: std::env::var("PUSH_GATEWAY_URL")
                .ok()
                .filter(|u| !u.is_empty()),
            fulfillment: FulfillmentConfig::from_env(),
        }
    }

    /// Fixed configuration for tests (no environment access)
    pub fn for_tests(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 0,
            environment: "test".into(),
            timezone: chrono_tz::Asia::Ho_Chi_Minh,
            log_level: "debug".into(),
            log_dir: None,
            log_json: false,
            jwt: JwtConfig::for_tests(),
            push_gateway_url: None,
            fulfillment: FulfillmentConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Reject settings the server cannot safely run with
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production() && !self.jwt.secret_from_env {
            return Err("JWT_SECRET must be set in production".into());
        }
        if self.jwt.secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".into());
        }
        if self.fulfillment.assignment_radius_km <= 0.0 {
            return Err("ASSIGNMENT_RADIUS_KM must be positive".into());
        }
        if self.fulfillment.assignment_max_attempts == 0 {
            return Err("ASSIGNMENT_MAX_ATTEMPTS must be at least 1".into());
        }
        Ok(())
    }

    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("market.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
