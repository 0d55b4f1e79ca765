//! Configuration loading and representation.
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file by the binary). Missing data-store or identity settings select the
//! in-memory adapters, which is how tests and local development run.

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_AUDIENCE: &str = "authenticated";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Connection settings for the Supabase admin API.
#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
}

impl core::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// `None` selects the in-memory identity provider.
    pub supabase: Option<SupabaseConfig>,
    pub jwt_secret: String,
    /// `None` disables the `aud` check.
    pub jwt_audience: Option<String>,
    pub cors_origins: CorsOrigins,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("supabase", &self.supabase)
            .field("jwt_audience", &self.jwt_audience)
            .field("cors_origins", &self.cors_origins)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut bind_addr: SocketAddr = var("BIND_ADDR")
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;
        if let Some(port) = var("PORT") {
            let port: u16 = port.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?;
            bind_addr.set_port(port);
        }

        let database_url = var("DATABASE_URL");

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig { url, service_role_key }),
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (None, _) => None,
        };

        let jwt_secret = match var("SUPABASE_JWT_SECRET").or_else(|| var("JWT_SECRET")) {
            Some(secret) => secret,
            None if database_url.is_none() && supabase.is_none() => {
                tracing::warn!("SUPABASE_JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::Missing("SUPABASE_JWT_SECRET")),
        };

        // An explicitly empty JWT_AUDIENCE disables the check.
        let jwt_audience = match lookup("JWT_AUDIENCE") {
            Some(aud) if aud.trim().is_empty() => None,
            Some(aud) => Some(aud.trim().to_string()),
            None => Some(DEFAULT_AUDIENCE.to_string()),
        };

        let cors_origins = match var("CORS_ALLOWED_ORIGINS") {
            None => CorsOrigins::Any,
            Some(v) if v == "*" => CorsOrigins::Any,
            Some(v) => CorsOrigins::List(
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
        };

        Ok(Self {
            bind_addr,
            database_url,
            supabase,
            jwt_secret,
            jwt_audience,
            cors_origins,
        })
    }
}
