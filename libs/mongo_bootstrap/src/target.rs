//! The seam between the bootstrap procedures and the database.

use crate::declare::{IndexDeclaration, RoleGrant, UserDeclaration};

/// Server error codes the procedures branch on.
pub mod codes {
    /// `UserNotFound`
    pub const USER_NOT_FOUND: i32 = 11;
    /// `IndexOptionsConflict`: same name or keys, different options.
    pub const INDEX_OPTIONS_CONFLICT: i32 = 85;
    /// `IndexKeySpecsConflict`: same name, different keys.
    pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
    /// `DuplicateKey`
    pub const DUPLICATE_KEY: i32 = 11000;
    /// Returned by `createUser` when the user already exists.
    pub const USER_ALREADY_EXISTS: i32 = 51003;
}

/// A failure reported by an [`AdminTarget`].
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The server rejected a command.
    #[error("command failed with code {code} ({code_name}): {message}")]
    Command {
        code: i32,
        code_name: String,
        message: String,
    },
    /// The driver failed for a reason other than a command error, f.e. a
    /// network or authentication problem.
    #[error(transparent)]
    Driver(Box<mongodb::error::Error>),
    /// The server replied with something the caller could not interpret.
    #[error("malformed server reply: {0}")]
    Reply(String),
    /// A declaration cannot be expressed as a command.
    #[error("invalid declaration: {0}")]
    Invalid(String),
}

impl TargetError {
    pub fn command(code: i32, code_name: &str, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            code_name: code_name.to_owned(),
            message: message.into(),
        }
    }

    /// The server error code, if this is a command error.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Command { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether `createUser` failed because the user already exists.
    #[must_use]
    pub fn is_user_already_exists(&self) -> bool {
        self.code() == Some(codes::USER_ALREADY_EXISTS)
    }

    /// Whether an index with the same name or keys but a different definition
    /// already exists.
    #[must_use]
    pub fn is_index_conflict(&self) -> bool {
        matches!(
            self.code(),
            Some(codes::INDEX_OPTIONS_CONFLICT | codes::INDEX_KEY_SPECS_CONFLICT)
        )
    }
}

impl From<mongodb::error::Error> for TargetError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match &*err.kind {
            ErrorKind::Command(cmd) => Self::Command {
                code: cmd.code,
                code_name: cmd.code_name.clone(),
                message: cmd.message.clone(),
            },
            _ => Self::Driver(Box::new(err)),
        }
    }
}

/// A database handle bound to one target database.
///
/// The bootstrap procedures only go through this trait so they can run
/// against a live server, a dry run or an in-memory model.
pub trait AdminTarget {
    /// The name of the bound database.
    fn database_name(&self) -> &str;

    /// Creates the declared index and returns the name the store reports.
    ///
    /// Creating an index that already exists with the same name and definition
    /// succeeds.
    fn create_index(
        &self,
        index: &IndexDeclaration,
    ) -> impl Future<Output = Result<String, TargetError>>;

    /// Lists the names of all indexes on a collection.
    fn list_index_names(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<String>, TargetError>>;

    /// Whether a user with that name exists on the bound database.
    fn user_exists(&self, username: &str) -> impl Future<Output = Result<bool, TargetError>>;

    /// Creates the user on the bound database.
    fn create_user(&self, user: &UserDeclaration) -> impl Future<Output = Result<(), TargetError>>;

    /// Grants roles to an existing user on the bound database.
    fn grant_roles(
        &self,
        username: &str,
        roles: &[RoleGrant],
    ) -> impl Future<Output = Result<(), TargetError>>;
}
