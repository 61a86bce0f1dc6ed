//! Provisions application users.

use crate::declare::UserDeclaration;
use crate::target::{AdminTarget, TargetError};

/// How [`provision_user`] decides between creating and granting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Look the user up first and branch on whether it exists. A create that
    /// fails because the user appeared in the meantime falls back to a grant.
    #[default]
    CheckFirst,
    /// Attempt to create the user and fall back to a grant on any failure.
    ///
    /// Failures other than "user already exists" are logged as warnings since
    /// the grant fallback is unlikely to be what fixes them.
    CreateFirst,
}

/// Why a user was granted its roles rather than created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantReason {
    /// The lookup found the user.
    AlreadyExisted,
    /// Creating the user failed and the fallback grant succeeded.
    CreateFailed,
}

/// The outcome of [`provision_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Granted(GrantReason),
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to look up user {username}@{database}")]
    Lookup {
        username: String,
        database: String,
        #[source]
        source: TargetError,
    },
    #[error("failed to create user {username}@{database}")]
    Create {
        username: String,
        database: String,
        #[source]
        source: TargetError,
    },
    #[error("failed to grant roles to user {username}@{database}")]
    Grant {
        username: String,
        database: String,
        #[source]
        source: TargetError,
    },
}

/// Creates the user, or grants its roles if it already exists.
///
/// The target must be bound to the user's database.
pub async fn provision_user<T>(
    target: &T,
    user: &UserDeclaration,
    strategy: Strategy,
) -> Result<Provisioned, ProvisionError>
where
    T: AdminTarget,
{
    debug_assert_eq!(
        target.database_name(),
        user.database,
        "target must be bound to the user's database"
    );

    let database = target.database_name();
    let result = match strategy {
        Strategy::CheckFirst => check_first(target, user).await?,
        Strategy::CreateFirst => create_first(target, user).await?,
    };

    match result {
        Provisioned::Created => log::info!("Created user {}@{database}.", user.username),
        Provisioned::Granted(_) => log::info!(
            "Granted {:?} to existing user {}@{database}.",
            user.roles,
            user.username
        ),
    }

    Ok(result)
}

async fn check_first<T: AdminTarget>(
    target: &T,
    user: &UserDeclaration,
) -> Result<Provisioned, ProvisionError> {
    let exists = target
        .user_exists(&user.username)
        .await
        .map_err(|source| ProvisionError::Lookup {
            username: user.username.clone(),
            database: target.database_name().to_owned(),
            source,
        })?;

    if exists {
        log::debug!("User {}@{} already exists.", user.username, target.database_name());
        grant(target, user).await?;
        return Ok(Provisioned::Granted(GrantReason::AlreadyExisted));
    }

    match target.create_user(user).await {
        Ok(()) => Ok(Provisioned::Created),
        Err(err) if err.is_user_already_exists() => {
            log::warn!(
                "User {}@{} appeared after the lookup: {err}",
                user.username,
                target.database_name()
            );
            grant(target, user).await?;
            Ok(Provisioned::Granted(GrantReason::CreateFailed))
        },
        Err(source) => Err(ProvisionError::Create {
            username: user.username.clone(),
            database: target.database_name().to_owned(),
            source,
        }),
    }
}

async fn create_first<T: AdminTarget>(
    target: &T,
    user: &UserDeclaration,
) -> Result<Provisioned, ProvisionError> {
    let err = match target.create_user(user).await {
        Ok(()) => return Ok(Provisioned::Created),
        Err(err) => err,
    };

    if err.is_user_already_exists() {
        log::info!(
            "Could not create user {}@{}, granting roles instead: {err}",
            user.username,
            target.database_name()
        );
    } else {
        log::warn!(
            "Creating user {}@{} failed with an unexpected error, granting roles anyway: {err}",
            user.username,
            target.database_name()
        );
    }

    grant(target, user).await?;
    Ok(Provisioned::Granted(GrantReason::CreateFailed))
}

async fn grant<T: AdminTarget>(target: &T, user: &UserDeclaration) -> Result<(), ProvisionError> {
    target
        .grant_roles(&user.username, &user.roles)
        .await
        .map_err(|source| ProvisionError::Grant {
            username: user.username.clone(),
            database: target.database_name().to_owned(),
            source,
        })
}
