//! [`AdminTarget`] for a live MongoDB database.

use bson::{Document, doc};
use mongodb::options::{Collation, CollationStrength, IndexOptions};
use mongodb::{Database, IndexModel};

use crate::declare::{CollationSpec, IndexDeclaration, RoleGrant, UserDeclaration, roles_array};
use crate::target::{AdminTarget, TargetError};

/// Converts a declaration into the driver's index model.
pub fn index_model(index: &IndexDeclaration) -> Result<IndexModel, TargetError> {
    let mut options = IndexOptions::default();
    options.name = Some(index.name.to_owned());
    options.unique = index.unique.then_some(true);
    options.partial_filter_expression = index.partial.map(|p| p.to_document());
    options.collation = index.collation.map(collation).transpose()?;

    Ok(IndexModel::builder()
        .keys(index.key_document())
        .options(options)
        .build())
}

fn collation(spec: CollationSpec) -> Result<Collation, TargetError> {
    let strength = match spec.strength {
        1 => CollationStrength::Primary,
        2 => CollationStrength::Secondary,
        3 => CollationStrength::Tertiary,
        4 => CollationStrength::Quaternary,
        5 => CollationStrength::Identical,
        other => {
            return Err(TargetError::Invalid(format!(
                "collation strength must be 1..=5, got {other}"
            )));
        },
    };

    Ok(Collation::builder()
        .locale(spec.locale.to_owned())
        .strength(strength)
        .build())
}

impl AdminTarget for Database {
    fn database_name(&self) -> &str {
        self.name()
    }

    async fn create_index(&self, index: &IndexDeclaration) -> Result<String, TargetError> {
        let model = index_model(index)?;
        let created = self
            .collection::<Document>(index.collection)
            .create_index(model)
            .await?;

        Ok(created.index_name)
    }

    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, TargetError> {
        Ok(self
            .collection::<Document>(collection)
            .list_index_names()
            .await?)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, TargetError> {
        let reply = self
            .run_command(doc! {
                "usersInfo": { "user": username, "db": self.name() },
            })
            .await?;

        let users = reply
            .get_array("users")
            .map_err(|_| TargetError::Reply("usersInfo reply lacks a `users` array".to_owned()))?;

        Ok(!users.is_empty())
    }

    async fn create_user(&self, user: &UserDeclaration) -> Result<(), TargetError> {
        self.run_command(doc! {
            "createUser": &user.username,
            "pwd": &user.password,
            "roles": user.roles_array(),
        })
        .await?;

        Ok(())
    }

    async fn grant_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), TargetError> {
        self.run_command(doc! {
            "grantRolesToUser": username,
            "roles": roles_array(roles),
        })
        .await?;

        Ok(())
    }
}
