//! The databases this tool bootstraps.

use mongo_bootstrap::{IndexDeclaration, UserDeclaration};

use crate::config::BUsersConfig;

mod tipster;
mod transaction;

/// Everything applied to one database.
#[derive(Debug)]
pub struct DatabasePlan {
    pub database: &'static str,
    pub indexes: &'static [IndexDeclaration],
    /// The application user, created with `readWrite` on this database.
    pub username: &'static str,
    password: fn(&BUsersConfig) -> &str,
}

impl DatabasePlan {
    #[must_use]
    pub fn user(&self, users: &BUsersConfig) -> UserDeclaration {
        UserDeclaration::read_write(self.username, (self.password)(users), self.database)
    }
}

/// All known databases, in the order they are bootstrapped by default.
pub const PLANS: &[DatabasePlan] = &[tipster::PLAN, transaction::PLAN];

/// Finds the plan for a database by name.
pub fn find(database: &str) -> Option<&'static DatabasePlan> {
    PLANS.iter().find(|p| p.database == database)
}
