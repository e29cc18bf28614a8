pub mod app_config;
pub mod config;
pub mod listing;
pub mod seed;
pub mod site;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::{
    Listing, ListingFields, MissingSellerRef, Provenance, SeedTag, TakenDownRef,
};
pub use seed::{parse_code_list, Seed};
pub use site::{fill_search_template, Selectors, SiteProfile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
