use mongo_bootstrap::PlannedCall;

use super::*;
use crate::config::{BUserConfig, UserStrategy};

fn users() -> BUsersConfig {
    BUsersConfig {
        root: BUserConfig {
            password: "pass.123".to_owned(),
        },
        support: BUserConfig {
            password: "support.123".to_owned(),
        },
    }
}

fn plan(name: &str) -> &'static DatabasePlan {
    schema::find(name).expect("plan must exist")
}

#[test]
fn select_in_configured_order() {
    let plans = select_plans(&["transaction".to_owned(), "tipster".to_owned()])
        .expect("both are known");
    let names = plans.iter().map(|p| p.database).collect::<Vec<_>>();

    assert_eq!(names, ["transaction", "tipster"], "order must follow the config");
}

#[test]
fn select_rejects_unknown() {
    let err = select_plans(&["tipster".to_owned(), "nope".to_owned()])
        .expect_err("unknown names must fail");

    assert!(err.to_string().contains("\"nope\""), "error must name the database: {err}");
    assert!(select_plans(&[]).is_err(), "empty selection must fail");
}

#[tokio::test]
async fn tipster_full_run() {
    let target = DryRun::new("tipster");
    let summary = bootstrap(&target, plan("tipster"), &BRunConfig::default(), &users())
        .await
        .expect("dry run must succeed");

    assert_eq!(
        summary,
        Summary {
            indexes: 14,
            user: Some(Provisioned::Created),
        },
        "all indexes and the user"
    );

    let calls = target.into_calls();
    let created = calls
        .iter()
        .filter(|c| matches!(c, PlannedCall::CreateIndex { .. }))
        .count();
    let listed = calls
        .iter()
        .filter_map(|c| match c {
            PlannedCall::ListIndexes { collection } => Some(collection.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();

    assert_eq!(created, 14, "one create per declaration");
    assert_eq!(listed, ["users", "tips", "comments"], "each collection verified once");
    assert_eq!(
        calls.last(),
        Some(&PlannedCall::CreateUser {
            username: "root".to_owned(),
        }),
        "user provisioning comes last"
    );
}

#[tokio::test]
async fn disabled_steps_are_skipped() {
    let run = BRunConfig {
        indexes: false,
        verify: false,
        user_strategy: UserStrategy::CreateFirst,
        ..BRunConfig::default()
    };

    let target = DryRun::new("transaction");
    let summary = bootstrap(&target, plan("transaction"), &run, &users())
        .await
        .expect("dry run must succeed");

    assert_eq!(summary.indexes, 0, "indexes disabled");
    assert_eq!(
        target.into_calls(),
        [PlannedCall::CreateUser {
            username: "support".to_owned(),
        }],
        "create first must not look the user up"
    );
}

#[tokio::test]
async fn verify_without_apply_fails() {
    let run = BRunConfig {
        indexes: false,
        users: false,
        ..BRunConfig::default()
    };

    let target = DryRun::new("transaction");
    let err = bootstrap(&target, plan("transaction"), &run, &users())
        .await
        .expect_err("nothing was created, so verification must fail");

    let message = err.to_string();
    assert!(
        message.contains("transaction.test/tgIX") && message.contains("transaction.test/gooIX"),
        "error must list missing indexes: {message}"
    );
}
