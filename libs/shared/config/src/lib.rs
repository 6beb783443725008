use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub redis_url: Option<String>,
    pub server_port: u16,
    pub reminder_sweep_interval_seconds: u64,
    pub reminder_catch_window_minutes: i64,
    pub reminder_default_lead_minutes: i64,
    pub reminder_lookup_timeout_ms: u64,
    pub reminder_scheduler_enabled: bool,
    pub notification_log_cap: usize,
    pub store_max_retries: u32,
    pub clinic_utc_offset_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            redis_url: None,
            server_port: 3000,
            reminder_sweep_interval_seconds: 300,
            reminder_catch_window_minutes: 5,
            reminder_default_lead_minutes: 30,
            reminder_lookup_timeout_ms: 2000,
            reminder_scheduler_enabled: false,
            notification_log_cap: 50,
            store_max_retries: 5,
            clinic_utc_offset_minutes: 0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            server_port: parse_or_default("SERVER_PORT", defaults.server_port),
            reminder_sweep_interval_seconds: parse_or_default(
                "REMINDER_SWEEP_INTERVAL_SECONDS",
                defaults.reminder_sweep_interval_seconds,
            ),
            reminder_catch_window_minutes: parse_or_default(
                "REMINDER_CATCH_WINDOW_MINUTES",
                defaults.reminder_catch_window_minutes,
            ),
            reminder_default_lead_minutes: parse_or_default(
                "REMINDER_DEFAULT_LEAD_MINUTES",
                defaults.reminder_default_lead_minutes,
            ),
            reminder_lookup_timeout_ms: parse_or_default(
                "REMINDER_LOOKUP_TIMEOUT_MS",
                defaults.reminder_lookup_timeout_ms,
            ),
            reminder_scheduler_enabled: parse_or_default(
                "REMINDER_SCHEDULER_ENABLED",
                defaults.reminder_scheduler_enabled,
            ),
            notification_log_cap: parse_or_default(
                "NOTIFICATION_LOG_CAP",
                defaults.notification_log_cap,
            ),
            store_max_retries: parse_or_default("STORE_MAX_RETRIES", defaults.store_max_retries),
            clinic_utc_offset_minutes: parse_or_default(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.redis_url.is_none() {
            warn!("REDIS_URL not set, falling back to the in-memory store");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_redis_configured(&self) -> bool {
        self.redis_url.is_some()
    }
}

fn parse_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
