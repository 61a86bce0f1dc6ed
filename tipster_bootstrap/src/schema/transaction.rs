use mongo_bootstrap::{Asc, CollationSpec, IndexDeclaration};

use super::DatabasePlan;
use crate::config::BUsersConfig;

pub const PLAN: DatabasePlan = DatabasePlan {
    database: "transaction",
    indexes: INDEXES,
    username: "support",
    password,
};

fn password(users: &BUsersConfig) -> &str {
    &users.support.password
}

/// English, case-insensitive.
const CASE_INSENSITIVE: CollationSpec = CollationSpec::new("en", 2);

const TELEGRAM_ID: &str = "Telegram.PlatformIdentity";
const GOOGLE_ID: &str = "Google.PlatformIdentity";

// a platform identity is unique among the documents that have one
const INDEXES: &[IndexDeclaration] = &[
    IndexDeclaration::new("transaction.test", "tgIX", &[(TELEGRAM_ID, Asc)])
        .unique()
        .when_exists(TELEGRAM_ID)
        .collation(CASE_INSENSITIVE),
    IndexDeclaration::new("transaction.test", "gooIX", &[(GOOGLE_ID, Asc)])
        .unique()
        .when_exists(GOOGLE_ID)
        .collation(CASE_INSENSITIVE),
];
