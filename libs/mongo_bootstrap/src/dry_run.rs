//! An [`AdminTarget`] that only logs what it would do.

use std::cell::RefCell;

use crate::declare::{IndexDeclaration, RoleGrant, UserDeclaration};
use crate::target::{AdminTarget, TargetError};

/// An operation the dry run was asked to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedCall {
    CreateIndex { collection: String, name: String },
    ListIndexes { collection: String },
    UserExists { username: String },
    CreateUser { username: String },
    GrantRoles { username: String, roles: Vec<RoleGrant> },
}

/// Performs no I/O. Every user is reported as absent and every declared index
/// is reported as present.
#[derive(Debug)]
pub struct DryRun {
    database: String,
    declared: RefCell<Vec<(String, String)>>,
    calls: RefCell<Vec<PlannedCall>>,
}

impl DryRun {
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            declared: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// The operations requested so far, in order.
    #[must_use]
    pub fn into_calls(self) -> Vec<PlannedCall> {
        self.calls.into_inner()
    }

    fn record(&self, call: PlannedCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl AdminTarget for DryRun {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn create_index(&self, index: &IndexDeclaration) -> Result<String, TargetError> {
        log::info!(
            "[dry run] would create index {}.{}/{} on {:?}",
            self.database,
            index.collection,
            index.name,
            index.key_document(),
        );

        self.declared
            .borrow_mut()
            .push((index.collection.to_owned(), index.name.to_owned()));
        self.record(PlannedCall::CreateIndex {
            collection: index.collection.to_owned(),
            name: index.name.to_owned(),
        });
        Ok(index.name.to_owned())
    }

    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, TargetError> {
        self.record(PlannedCall::ListIndexes {
            collection: collection.to_owned(),
        });

        // `_id_` always exists on a real collection
        let names = std::iter::once("_id_".to_owned())
            .chain(
                self.declared
                    .borrow()
                    .iter()
                    .filter(|(c, _)| c == collection)
                    .map(|(_, n)| n.clone()),
            )
            .collect();
        Ok(names)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, TargetError> {
        self.record(PlannedCall::UserExists {
            username: username.to_owned(),
        });
        Ok(false)
    }

    async fn create_user(&self, user: &UserDeclaration) -> Result<(), TargetError> {
        log::info!(
            "[dry run] would create user {}@{} with roles {:?}",
            user.username,
            self.database,
            user.roles,
        );

        self.record(PlannedCall::CreateUser {
            username: user.username.clone(),
        });
        Ok(())
    }

    async fn grant_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), TargetError> {
        log::info!("[dry run] would grant {roles:?} to {username}@{}", self.database);

        self.record(PlannedCall::GrantRoles {
            username: username.to_owned(),
            roles: roles.to_vec(),
        });
        Ok(())
    }
}
