//! Idempotent bootstrap procedures for MongoDB databases.
//!
//! A bootstrap consists of two independent steps per database:
//!
//! - [`apply_indexes`] creates a fixed, ordered list of [`IndexDeclaration`]s.
//! - [`provision_user`] creates an application user, or grants its roles if
//!   the user already exists.
//!
//! Both go through [`AdminTarget`], which is implemented for
//! [`mongodb::Database`] and for the logging-only [`DryRun`].

pub mod declare;
mod dry_run;
mod indexes;
pub mod mongo;
pub mod target;
mod users;

#[cfg(test)]
mod memory;

pub use declare::{
    Asc, CollationSpec, Desc, Direction, IndexDeclaration, PartialFilter, RoleGrant,
    UserDeclaration,
};
pub use dry_run::{DryRun, PlannedCall};
pub use indexes::{
    IndexError, IndexReport, MissingIndex, VerifyError, apply_indexes, verify_indexes,
};
pub use target::{AdminTarget, TargetError};
pub use users::{GrantReason, ProvisionError, Provisioned, Strategy, provision_user};
