use std::time::Duration;

use serde::Deserialize;
use serde_with::{DisplayFromStr, DurationSeconds, PickFirst, serde_as};

pub mod setup;

/// Prefix of environment variables that override the config.
pub const ENV_PREFIX: &str = "TIPSTER_BOOTSTRAP__";

#[derive(Debug, Deserialize)]
pub struct BConfig {
    pub mongodb: BMongoConfig,
    #[serde(default)]
    pub run: BRunConfig,
    pub users: BUsersConfig,
    #[serde(default)]
    pub log: BLogConfig,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BMongoConfig {
    /// Connection string of an account allowed to create indexes and users.
    pub uri: String,
    pub app_name: Option<String>,
    #[serde_as(as = "PickFirst<(DurationSeconds<u64>, DurationSeconds<String>)>")]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde_as(as = "PickFirst<(DurationSeconds<u64>, DurationSeconds<String>)>")]
    #[serde(default = "default_server_selection_timeout")]
    pub server_selection_timeout: Duration,
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_server_selection_timeout() -> Duration {
    Duration::from_secs(15)
}

/// How users are provisioned. See [`mongo_bootstrap::Strategy`].
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStrategy {
    #[default]
    CheckFirst,
    CreateFirst,
}

impl From<UserStrategy> for mongo_bootstrap::Strategy {
    fn from(value: UserStrategy) -> Self {
        match value {
            UserStrategy::CheckFirst => Self::CheckFirst,
            UserStrategy::CreateFirst => Self::CreateFirst,
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_databases() -> Vec<String> {
    crate::schema::PLANS.iter().map(|p| p.database.to_owned()).collect()
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BRunConfig {
    /// Databases to bootstrap, in order.
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_true")]
    pub indexes: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_true")]
    pub verify: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_true")]
    pub users: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub user_strategy: UserStrategy,
}

impl Default for BRunConfig {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            indexes: true,
            verify: true,
            users: true,
            dry_run: false,
            user_strategy: UserStrategy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BUsersConfig {
    pub root: BUserConfig,
    pub support: BUserConfig,
}

#[derive(Deserialize)]
pub struct BUserConfig {
    pub password: String,
}

impl std::fmt::Debug for BUserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BUserConfig")
            .field("password", &"<redacted>")
            .finish()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub struct BLogConfig {
    /// Whether to install a panic hook that writes panics to the logger.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_true")]
    pub panic: bool,
    #[serde(default)]
    pub log4rs: log4rs::config::RawConfig,
}

impl Default for BLogConfig {
    fn default() -> Self {
        Self {
            panic: true,
            log4rs: log4rs::config::RawConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::setup::{Builder, Env, TomlText};
    use super::*;

    const DEFAULTS: &str = include_str!("../../assets/default_config.toml");

    fn build(vars: &[(&str, &str)]) -> anyhow::Result<BConfig> {
        Builder::new()
            .add_layer(TomlText::new(DEFAULTS))
            .add_layer(Env::prefixed(ENV_PREFIX).with_vars(vars.iter().copied()))
            .build()
    }

    #[test]
    fn defaults_need_uri() {
        assert!(build(&[]).is_err(), "mongodb.uri has no default");
    }

    #[test]
    fn defaults_with_uri() {
        let config = build(&[("TIPSTER_BOOTSTRAP__MONGODB__URI", "mongodb://localhost")])
            .expect("defaults must be valid");

        assert_eq!(config.mongodb.uri, "mongodb://localhost", "uri from env");
        assert_eq!(config.mongodb.connect_timeout, Duration::from_secs(10), "default timeout");
        assert_eq!(config.run.databases, ["tipster", "transaction"], "both databases by default");
        assert!(config.run.indexes && config.run.verify && config.run.users, "all steps enabled");
        assert!(!config.run.dry_run, "dry run disabled");
        assert_eq!(config.run.user_strategy, UserStrategy::CheckFirst, "check first by default");
        assert_eq!(config.users.root.password, "pass.123", "root password");
        assert!(config.log.panic, "panic hook enabled");
    }

    #[test]
    fn env_strings_parse() {
        let config = build(&[
            ("TIPSTER_BOOTSTRAP__MONGODB__URI", "mongodb://localhost"),
            ("TIPSTER_BOOTSTRAP__MONGODB__CONNECT_TIMEOUT", "3"),
            ("TIPSTER_BOOTSTRAP__RUN__DRY_RUN", "true"),
            ("TIPSTER_BOOTSTRAP__RUN__USER_STRATEGY", "create_first"),
            ("TIPSTER_BOOTSTRAP__USERS__SUPPORT__PASSWORD", "123"),
        ])
        .expect("string env values must parse");

        assert_eq!(config.mongodb.connect_timeout, Duration::from_secs(3), "timeout from env");
        assert!(config.run.dry_run, "dry run from env");
        assert_eq!(config.run.user_strategy, UserStrategy::CreateFirst, "strategy from env");
        assert_eq!(config.users.support.password, "123", "numeric-looking password stays a string");
    }

    #[test]
    fn password_is_not_printed() {
        let config = build(&[("TIPSTER_BOOTSTRAP__MONGODB__URI", "mongodb://localhost")])
            .expect("defaults must be valid");

        assert!(!format!("{config:?}").contains("pass.123"), "debug output must redact passwords");
    }
}
