//! Applies and verifies index declarations.

use crate::declare::IndexDeclaration;
use crate::target::{AdminTarget, TargetError};

/// Index creation failed. The remaining declarations were not applied.
#[derive(Debug, thiserror::Error)]
#[error("failed to create index {database}.{collection}/{name}")]
pub struct IndexError {
    pub database: String,
    pub collection: &'static str,
    pub name: &'static str,
    #[source]
    pub source: TargetError,
}

/// Listing the indexes of a collection failed during verification.
#[derive(Debug, thiserror::Error)]
#[error("failed to list indexes of {database}.{collection}")]
pub struct VerifyError {
    pub database: String,
    pub collection: &'static str,
    #[source]
    pub source: TargetError,
}

/// The outcome of [`apply_indexes`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// `(collection, reported index name)` in application order.
    pub applied: Vec<(&'static str, String)>,
}

impl IndexReport {
    /// The number of indexes applied to one collection.
    #[must_use]
    pub fn count_for(&self, collection: &str) -> usize {
        self.applied.iter().filter(|(c, _)| *c == collection).count()
    }
}

/// A declared index that the store does not list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingIndex {
    pub collection: &'static str,
    pub name: &'static str,
}

impl std::fmt::Display for MissingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.name)
    }
}

/// Applies every declaration in order.
///
/// Existing indexes with the same name and definition are left as they are.
/// The first failure aborts, including a conflicting definition under the
/// same name; conflicting indexes are never dropped.
pub async fn apply_indexes<T>(
    target: &T,
    declarations: &[IndexDeclaration],
) -> Result<IndexReport, IndexError>
where
    T: AdminTarget,
{
    let mut report = IndexReport::default();
    for index in declarations {
        let name = target
            .create_index(index)
            .await
            .map_err(|source| IndexError {
                database: target.database_name().to_owned(),
                collection: index.collection,
                name: index.name,
                source,
            })?;

        if name != index.name {
            log::warn!(
                "Index {}.{}/{} was reported back as {name}.",
                target.database_name(),
                index.collection,
                index.name,
            );
        }

        log::trace!("Ensured index {}.{}/{name}.", target.database_name(), index.collection);
        report.applied.push((index.collection, name));
    }

    log::info!(
        "Ensured {} index(es) on {}.",
        report.applied.len(),
        target.database_name()
    );
    Ok(report)
}

/// Lists the indexes of every declared collection and returns the declarations
/// whose name is not present.
pub async fn verify_indexes<T>(
    target: &T,
    declarations: &[IndexDeclaration],
) -> Result<Vec<MissingIndex>, VerifyError>
where
    T: AdminTarget,
{
    let mut collections: Vec<&'static str> = Vec::new();
    for index in declarations {
        if !collections.contains(&index.collection) {
            collections.push(index.collection);
        }
    }

    let mut missing = Vec::new();
    for collection in collections {
        let names = target
            .list_index_names(collection)
            .await
            .map_err(|source| VerifyError {
                database: target.database_name().to_owned(),
                collection,
                source,
            })?;

        missing.extend(
            declarations
                .iter()
                .filter(|i| i.collection == collection)
                .filter(|i| !names.iter().any(|n| n == i.name))
                .map(|i| MissingIndex {
                    collection,
                    name: i.name,
                }),
        );
    }

    Ok(missing)
}
