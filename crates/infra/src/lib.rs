//! Infrastructure layer: stores, identity provider adapters, provisioning and
//! configuration.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod identity;
pub mod records;


pub use bootstrap::{BootstrapError, Bootstrapper, Profile, SignupRequest};
pub use config::{ApiConfig, ConfigError, CorsOrigins, SupabaseConfig};
pub use directory::{InMemoryTenantDirectory, PostgresTenantDirectory, TenantDirectory};
pub use error::StoreError;
pub use identity::{IdentityError, IdentityProvider, InMemoryIdentityProvider, SupabaseIdentityProvider};
pub use records::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
