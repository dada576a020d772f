//! Environment-driven configuration.
//!
//! Hosted-service credentials are all optional: without backend
//! credentials the server runs against the in-memory store, without a
//! calendar key the sync trigger reports an unconfigured feed, without a
//! push key notices simply skip the push. That keeps local development a
//! zero-setup affair.

use std::{env, fmt::Display, str::FromStr};

use chrono_tz::Tz;
use tracing::{info, warn};

const DEFAULT_PORT: &str = "4810";
const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";
const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

pub struct Config {
    pub port: u16,
    /// Timezone the club's calendar days are computed in.
    pub timezone: Tz,
    /// Shared secret admin clients present in `x-admin-token`.
    pub admin_token: Option<String>,

    // Hosted backend (PostgREST-style API)
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,

    // Upstream calendar feed
    pub google_calendar_id: Option<String>,
    pub google_api_key: Option<String>,

    // Push gateway
    pub fcm_endpoint: String,
    pub fcm_server_key: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        let config = Config {
            port: try_load("CLUBHOUSE_PORT", DEFAULT_PORT),
            timezone: try_load("CLUBHOUSE_TIMEZONE", DEFAULT_TIMEZONE),
            admin_token: var("CLUBHOUSE_ADMIN_TOKEN").ok(),
            backend_url: var("SUPABASE_URL").ok(),
            backend_key: var("SUPABASE_SERVICE_KEY").ok(),
            google_calendar_id: var("GOOGLE_CALENDAR_ID").ok(),
            google_api_key: var("GOOGLE_API_KEY").ok(),
            fcm_endpoint: try_load("FCM_ENDPOINT", DEFAULT_FCM_ENDPOINT),
            fcm_server_key: var("FCM_SERVER_KEY").ok(),
        };

        if config.admin_token.is_none() {
            warn!("CLUBHOUSE_ADMIN_TOKEN not set, admin routes are disabled");
        }
        config
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| ())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
