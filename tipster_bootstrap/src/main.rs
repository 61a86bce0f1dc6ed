mod build;
mod config;
mod logging;
mod prelude;
mod runner;
mod schema;

fn main() -> anyhow::Result<()> {
    use std::panic;

    use crate::build::{GIT_HASH, VERSION};
    use crate::config::BConfig;
    use crate::prelude::*;

    return inner();

    // short async fn to reduce `tokio::main` scope
    #[tokio::main]
    async fn inner() -> anyhow::Result<()> {
        let res = run().await;
        if let Err(why) = &res {
            log::error!("Exiting due to error: {why:?}");
        }

        log::logger().flush();
        res
    }

    async fn run() -> Result {
        let config = build_config()?;
        init_logging(&config.log.log4rs)?;

        if config.log.panic {
            // register the custom panic handler after logging is set up
            panic::set_hook(Box::new(on_panic));
        }

        log::info!(target: "tipster_bootstrap::version", "Tipster Bootstrap v{VERSION} - {GIT_HASH}");

        crate::runner::run(&config).await?;

        log::info!("Bootstrap complete.");
        Ok(())
    }

    /// Writes panics to the logger, with a backtrace, and flushes it.
    fn on_panic(info: &panic::PanicHookInfo<'_>) {
        use std::backtrace::Backtrace;
        use std::io::{Write as _, stdout};

        let backtrace = Backtrace::force_capture();
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");

        // in case the loggers fail or are empty
        _ = writeln!(stdout(), "thread '{name}' {info}");
        log::error!("thread '{name}' {info}\n{backtrace}");
        log::logger().flush();
    }

    fn profile() -> Result<Cow<'static, str>> {
        use std::env::VarError::NotPresent;
        use std::env::var;

        match var("TIPSTER_BOOTSTRAP_PROFILE") {
            Ok(value) => Ok(value.into()),
            Err(NotPresent) => Ok("release".into()),
            Err(err) => Err(err).context("cannot load TIPSTER_BOOTSTRAP_PROFILE env variable"),
        }
    }

    fn build_config() -> Result<BConfig> {
        use crate::config::ENV_PREFIX;
        use crate::config::setup::{Builder, Env, File, TomlText};

        let profile = profile()?;
        let profile_config = format!("tipster_bootstrap.{profile}.toml");
        let default_config = include_str!("../assets/default_config.toml");

        Builder::new()
            .add_layer(TomlText::new(default_config))
            .add_layer(File::new("tipster_bootstrap.toml").required(false))
            .add_layer(File::new(&profile_config).required(false))
            .add_layer(Env::prefixed(ENV_PREFIX))
            .build()
    }

    fn init_logging(config: &log4rs::config::RawConfig) -> Result {
        let deserializers = crate::logging::deserializers();
        let (appenders, errors) = config.appenders_lossy(&deserializers);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let config = log4rs::Config::builder()
            .appenders(appenders)
            .loggers(config.loggers())
            .build(config.root())?;

        log4rs::init_config(config)?;
        Ok(())
    }
}
