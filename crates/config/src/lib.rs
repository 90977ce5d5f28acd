// Configuration loading

pub mod settings;

pub use settings::{
    BalanceSettings, ConfigError, CredentialSettings, PortalSettings, QuerySettings, Settings,
};
