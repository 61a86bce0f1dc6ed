//! In-memory model of the store behaviors the procedures rely on.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use bson::{Bson, Document};

use crate::declare::{IndexDeclaration, PartialFilter, RoleGrant, UserDeclaration};
use crate::target::{AdminTarget, TargetError, codes};

#[derive(Debug, Default)]
struct State {
    indexes: BTreeMap<String, Vec<IndexDeclaration>>,
    documents: BTreeMap<String, Vec<Document>>,
    users: BTreeMap<String, Vec<RoleGrant>>,
    create_user_failure: Option<TargetError>,
    grant_failure: Option<TargetError>,
}

#[derive(Debug)]
pub struct MemoryStore {
    database: String,
    state: RefCell<State>,
    create_user_calls: Cell<usize>,
    grant_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_owned(),
            state: RefCell::default(),
            create_user_calls: Cell::new(0),
            grant_calls: Cell::new(0),
        }
    }

    /// Makes the next `createUser` fail with this error.
    pub fn fail_next_create_user(&self, err: TargetError) {
        self.state.borrow_mut().create_user_failure = Some(err);
    }

    /// Makes the next `grantRolesToUser` fail with this error.
    pub fn fail_next_grant(&self, err: TargetError) {
        self.state.borrow_mut().grant_failure = Some(err);
    }

    pub fn create_user_calls(&self) -> usize {
        self.create_user_calls.get()
    }

    pub fn grant_calls(&self) -> usize {
        self.grant_calls.get()
    }

    /// Index names on a collection, excluding `_id_`, in creation order.
    pub fn index_names(&self, collection: &str) -> Vec<&'static str> {
        self.state
            .borrow()
            .indexes
            .get(collection)
            .map(|i| i.iter().map(|d| d.name).collect())
            .unwrap_or_default()
    }

    /// All index declarations, per collection.
    pub fn index_snapshot(&self) -> BTreeMap<String, Vec<IndexDeclaration>> {
        self.state.borrow().indexes.clone()
    }

    pub fn user_roles(&self, username: &str) -> Option<Vec<RoleGrant>> {
        self.state.borrow().users.get(username).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.borrow().users.len()
    }

    /// Inserts a document, enforcing the unique indexes on the collection.
    pub fn insert(&self, collection: &str, document: Document) -> Result<(), TargetError> {
        let mut state = self.state.borrow_mut();
        let unique = state
            .indexes
            .get(collection)
            .map(|i| i.iter().filter(|d| d.unique).copied().collect::<Vec<_>>())
            .unwrap_or_default();

        let existing = state.documents.entry(collection.to_owned()).or_default();
        for index in &unique {
            if !matches_filter(index, &document) {
                continue;
            }

            let key = index_key(index, &document);
            let duplicate = existing
                .iter()
                .filter(|d| matches_filter(index, d))
                .any(|d| index_key(index, d) == key);

            if duplicate {
                return Err(TargetError::command(
                    codes::DUPLICATE_KEY,
                    "DuplicateKey",
                    format!("E11000 duplicate key error collection: {collection} index: {}", index.name),
                ));
            }
        }

        existing.push(document);
        Ok(())
    }
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

fn matches_filter(index: &IndexDeclaration, document: &Document) -> bool {
    match index.partial {
        None => true,
        Some(PartialFilter::Exists(field)) => lookup(document, field).is_some(),
    }
}

fn index_key(index: &IndexDeclaration, document: &Document) -> Vec<Bson> {
    let fold_case = index.collation.is_some_and(|c| c.is_case_insensitive());
    index
        .keys
        .iter()
        .map(|&(field, _)| match lookup(document, field) {
            Some(Bson::String(s)) if fold_case => Bson::String(s.to_lowercase()),
            Some(value) => value.clone(),
            None => Bson::Null,
        })
        .collect()
}

impl AdminTarget for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn create_index(&self, index: &IndexDeclaration) -> Result<String, TargetError> {
        let mut state = self.state.borrow_mut();
        let indexes = state.indexes.entry(index.collection.to_owned()).or_default();

        if let Some(existing) = indexes.iter().find(|i| i.name == index.name) {
            return if existing.same_definition(index) {
                Ok(existing.name.to_owned())
            } else if existing.same_keys(index) {
                Err(TargetError::command(
                    codes::INDEX_OPTIONS_CONFLICT,
                    "IndexOptionsConflict",
                    format!("An existing index has the same name as the requested index: {}", index.name),
                ))
            } else {
                Err(TargetError::command(
                    codes::INDEX_KEY_SPECS_CONFLICT,
                    "IndexKeySpecsConflict",
                    format!("An existing index has the same name as the requested index: {}", index.name),
                ))
            };
        }

        if let Some(existing) = indexes.iter().find(|i| i.same_definition(index)) {
            return Err(TargetError::command(
                codes::INDEX_OPTIONS_CONFLICT,
                "IndexOptionsConflict",
                format!("Index already exists with a different name: {}", existing.name),
            ));
        }

        indexes.push(*index);
        Ok(index.name.to_owned())
    }

    async fn list_index_names(&self, collection: &str) -> Result<Vec<String>, TargetError> {
        let state = self.state.borrow();
        let Some(indexes) = state.indexes.get(collection) else {
            return Err(TargetError::command(
                26,
                "NamespaceNotFound",
                format!("ns does not exist: {}.{collection}", self.database),
            ));
        };

        let names = std::iter::once("_id_")
            .chain(indexes.iter().map(|i| i.name))
            .map(str::to_owned)
            .collect();
        Ok(names)
    }

    async fn user_exists(&self, username: &str) -> Result<bool, TargetError> {
        Ok(self.state.borrow().users.contains_key(username))
    }

    async fn create_user(&self, user: &UserDeclaration) -> Result<(), TargetError> {
        self.create_user_calls.set(self.create_user_calls.get() + 1);

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.create_user_failure.take() {
            return Err(err);
        }

        if state.users.contains_key(&user.username) {
            return Err(TargetError::command(
                codes::USER_ALREADY_EXISTS,
                "Location51003",
                format!("User \"{}@{}\" already exists", user.username, self.database),
            ));
        }

        let mut roles = Vec::new();
        add_roles(&mut roles, &user.roles);
        state.users.insert(user.username.clone(), roles);
        Ok(())
    }

    async fn grant_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), TargetError> {
        self.grant_calls.set(self.grant_calls.get() + 1);

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.grant_failure.take() {
            return Err(err);
        }

        let Some(granted) = state.users.get_mut(username) else {
            return Err(TargetError::command(
                codes::USER_NOT_FOUND,
                "UserNotFound",
                format!("Could not find user \"{username}\" for db \"{}\"", self.database),
            ));
        };

        add_roles(granted, roles);
        Ok(())
    }
}

// roles are a set on the server
fn add_roles(target: &mut Vec<RoleGrant>, roles: &[RoleGrant]) {
    for role in roles {
        if !target.contains(role) {
            target.push(role.clone());
        }
    }
}
