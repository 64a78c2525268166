use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// How invoice writes treat product/invoice ids that do not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Reject dangling references before anything is written
    #[default]
    Strict,
    /// Accept dangling references silently, with engine foreign keys off
    Lenient,
}

impl ReferencePolicy {
    pub fn is_strict(self) -> bool {
        matches!(self, ReferencePolicy::Strict)
    }
}

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default)]
    pub reference_policy: ReferencePolicy,
}

fn default_database_url() -> String {
    "sqlite://invoices.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            reference_policy: ReferencePolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    dotenv().ok();

    let config = Config::load()?;

    Ok(config)
}
