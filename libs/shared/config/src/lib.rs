use std::env;
use std::str::FromStr;
use tracing::warn;

/// Where the scheduling engine keeps templates, policies and the booking ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" | "in-memory" => Ok(StorageBackend::Memory),
            "supabase" | "postgres" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub storage_backend: StorageBackend,
    pub bind_address: String,
    pub booking_max_retries: u32,
    pub booking_retry_backoff_ms: u64,
    pub booking_transaction_timeout_ms: u64,
    pub default_provider_timezone: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: String::new(),
            storage_backend: StorageBackend::Memory,
            bind_address: "0.0.0.0:3000".to_string(),
            booking_max_retries: 3,
            booking_retry_backoff_ms: 100,
            booking_transaction_timeout_ms: 5_000,
            default_provider_timezone: "UTC".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_default(),
            storage_backend: parse_or_default(
                "SCHEDULING_STORAGE",
                env::var("SCHEDULING_STORAGE").ok(),
                defaults.storage_backend,
            ),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or(defaults.bind_address),
            booking_max_retries: parse_or_default(
                "BOOKING_MAX_RETRIES",
                env::var("BOOKING_MAX_RETRIES").ok(),
                defaults.booking_max_retries,
            ),
            booking_retry_backoff_ms: parse_or_default(
                "BOOKING_RETRY_BACKOFF_MS",
                env::var("BOOKING_RETRY_BACKOFF_MS").ok(),
                defaults.booking_retry_backoff_ms,
            ),
            booking_transaction_timeout_ms: parse_or_default(
                "BOOKING_TRANSACTION_TIMEOUT_MS",
                env::var("BOOKING_TRANSACTION_TIMEOUT_MS").ok(),
                defaults.booking_transaction_timeout_ms,
            ),
            default_provider_timezone: env::var("DEFAULT_PROVIDER_TIMEZONE")
                .unwrap_or(defaults.default_provider_timezone),
        };

        if config.storage_backend == StorageBackend::Supabase && !config.is_supabase_configured() {
            warn!("Supabase storage selected but SUPABASE_URL or keys are missing");
        }

        config
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && (!self.supabase_anon_key.is_empty() || !self.supabase_service_role_key.is_empty())
    }

    /// Key used for server-side PostgREST calls. The service role key wins when present.
    pub fn supabase_api_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", key, value, default);
            default
        }),
    }
}
