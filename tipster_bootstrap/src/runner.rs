//! Connects to the cluster and bootstraps each selected database.

use bson::doc;
use mongo_bootstrap::{
    AdminTarget, DryRun, Provisioned, apply_indexes, provision_user, verify_indexes,
};
use mongodb::Client;
use mongodb::options::ClientOptions;

use crate::config::{BConfig, BMongoConfig, BRunConfig, BUsersConfig};
use crate::prelude::*;
use crate::schema::{self, DatabasePlan};

/// What [`bootstrap`] did for one database.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub indexes: usize,
    pub user: Option<Provisioned>,
}

/// Bootstraps every database selected in the config, in order.
///
/// The first database that fails aborts the run.
pub async fn run(config: &BConfig) -> Result {
    let plans = select_plans(&config.run.databases)?;

    if config.run.dry_run {
        log::warn!("Dry run: no changes will be made.");
        for plan in plans {
            let target = DryRun::new(plan.database);
            bootstrap(&target, plan, &config.run, &config.users).await?;

            let calls = target.into_calls();
            log::info!("[dry run] {} operation(s) planned for {}.", calls.len(), plan.database);
        }

        return Ok(());
    }

    let client = connect(&config.mongodb).await?;
    for plan in plans {
        let database = client.database(plan.database);
        let summary = bootstrap(&database, plan, &config.run, &config.users).await?;
        log::debug!("Finished {}: {summary:?}", plan.database);
    }

    Ok(())
}

/// Resolves configured database names to their plans.
pub fn select_plans(databases: &[String]) -> Result<Vec<&'static DatabasePlan>> {
    anyhow::ensure!(!databases.is_empty(), "run.databases must not be empty");

    databases
        .iter()
        .map(|name| {
            schema::find(name).with_context(|| {
                let known = schema::PLANS.iter().map(|p| p.database).collect::<Vec<_>>();
                format!("unknown database {name:?} in run.databases, expected one of {known:?}")
            })
        })
        .collect()
}

/// Runs the enabled steps of `plan` against `target`.
pub async fn bootstrap<T>(
    target: &T,
    plan: &DatabasePlan,
    run: &BRunConfig,
    users: &BUsersConfig,
) -> Result<Summary>
where
    T: AdminTarget,
{
    let mut summary = Summary::default();

    if run.indexes {
        let report = apply_indexes(target, plan.indexes).await?;
        summary.indexes = report.applied.len();
    }

    if run.verify {
        let missing = verify_indexes(target, plan.indexes).await?;
        if !missing.is_empty() {
            let missing = missing.iter().map(ToString::to_string).collect::<Vec<_>>();
            anyhow::bail!(
                "database {} is missing declared indexes: {}",
                plan.database,
                missing.join(", ")
            );
        }

        log::info!("Verified {} index(es) on {}.", plan.indexes.len(), plan.database);
    }

    if run.users {
        let user = plan.user(users);
        summary.user = Some(provision_user(target, &user, run.user_strategy.into()).await?);
    }

    Ok(summary)
}

async fn connect(config: &BMongoConfig) -> Result<Client> {
    let mut options = ClientOptions::parse(&config.uri)
        .await
        .context("invalid mongodb.uri")?;

    options.app_name.clone_from(&config.app_name);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.server_selection_timeout);

    let client = Client::with_options(options).context("failed to create database client")?;

    // the driver connects lazily, so ping to fail before doing any work
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .context("failed to connect to database cluster")?;

    log::info!("Connected to MongoDB.");
    Ok(client)
}

#[cfg(test)]
mod tests;
