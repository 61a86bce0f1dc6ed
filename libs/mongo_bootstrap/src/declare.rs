//! Static declarations of indexes and users.
//!
//! Index declarations are plain `const` data so a database's full index list
//! can be written as a `&'static [IndexDeclaration]`.

use bson::{Bson, Document, doc};

/// Sort direction of a single indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

pub use Direction::{Asc, Desc};

impl Direction {
    /// The numeric value MongoDB expects in a key pattern.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

/// Predicate that restricts an index to a subset of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialFilter {
    /// Only documents where the (possibly dotted) field exists.
    Exists(&'static str),
}

impl PartialFilter {
    /// Converts the filter to its `partialFilterExpression` document.
    #[must_use]
    pub fn to_document(self) -> Document {
        let mut filter = Document::new();
        match self {
            Self::Exists(field) => _ = filter.insert(field, doc! { "$exists": true }),
        }
        filter
    }
}

/// Locale-aware string comparison rules for an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollationSpec {
    pub locale: &'static str,
    /// Comparison level, `1..=5`. Levels 1 and 2 ignore case.
    pub strength: u8,
}

impl CollationSpec {
    #[must_use]
    pub const fn new(locale: &'static str, strength: u8) -> Self {
        Self { locale, strength }
    }

    /// Whether strings compare equal regardless of letter case.
    #[must_use]
    pub const fn is_case_insensitive(self) -> bool {
        self.strength <= 2
    }
}

/// A single "create index" declaration for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct IndexDeclaration {
    pub collection: &'static str,
    pub name: &'static str,
    pub keys: &'static [(&'static str, Direction)],
    pub unique: bool,
    pub partial: Option<PartialFilter>,
    pub collation: Option<CollationSpec>,
}

impl IndexDeclaration {
    /// Declares a plain index. Use the chained `const fn`s to add constraints.
    pub const fn new(
        collection: &'static str,
        name: &'static str,
        keys: &'static [(&'static str, Direction)],
    ) -> Self {
        Self {
            collection,
            name,
            keys,
            unique: false,
            partial: None,
            collation: None,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to documents where `field` exists.
    pub const fn when_exists(mut self, field: &'static str) -> Self {
        self.partial = Some(PartialFilter::Exists(field));
        self
    }

    pub const fn collation(mut self, collation: CollationSpec) -> Self {
        self.collation = Some(collation);
        self
    }

    /// The key pattern, preserving field order.
    #[must_use]
    pub fn key_document(&self) -> Document {
        self.keys
            .iter()
            .map(|&(field, dir)| (field.to_owned(), Bson::Int32(dir.value())))
            .collect()
    }

    /// Whether another declaration uses the same key pattern, ignoring name and
    /// options.
    #[must_use]
    pub fn same_keys(&self, other: &Self) -> bool {
        self.keys == other.keys
    }

    /// Whether another declaration has the same keys and options, ignoring the
    /// name and collection.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.same_keys(other)
            && self.unique == other.unique
            && self.partial == other.partial
            && self.collation == other.collation
    }
}

/// A role on a specific database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleGrant {
    pub role: String,
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }

    /// The `readWrite` role on `db`.
    pub fn read_write(db: impl Into<String>) -> Self {
        Self::new("readWrite", db)
    }

    #[must_use]
    pub fn to_document(&self) -> Document {
        doc! { "role": &self.role, "db": &self.db }
    }
}

/// An application user to provision on one database.
#[derive(Clone, PartialEq, Eq)]
pub struct UserDeclaration {
    pub username: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
    /// The database the user is created in.
    pub database: String,
}

impl UserDeclaration {
    /// Declares a user with `readWrite` on its own database.
    pub fn read_write(
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        let database = database.into();
        Self {
            username: username.into(),
            password: password.into(),
            roles: vec![RoleGrant::read_write(database.clone())],
            database,
        }
    }

    /// The roles as a BSON array, as `createUser` and `grantRolesToUser` expect.
    #[must_use]
    pub fn roles_array(&self) -> Vec<Bson> {
        roles_array(&self.roles)
    }
}

// keeps the password out of logs
impl std::fmt::Debug for UserDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDeclaration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .field("database", &self.database)
            .finish()
    }
}

pub(crate) fn roles_array(roles: &[RoleGrant]) -> Vec<Bson> {
    roles
        .iter()
        .map(|r| Bson::Document(r.to_document()))
        .collect()
}
