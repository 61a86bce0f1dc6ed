//! Layered loading of the TOML configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use toml::map::Entry;
use toml::{Table, Value};

/// Merges configuration layers into one table and deserializes it.
#[must_use]
pub struct Builder {
    table: Result<Table>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            table: Ok(Table::new()),
        }
    }

    /// Adds a layer. Layers added later take precedence over earlier ones.
    pub fn add_layer<L: Layer>(mut self, source: L) -> Self {
        self.table = self.table.and_then(|mut t| {
            source.extend_table(&mut t)?;
            Ok(t)
        });
        self
    }

    pub fn build<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let table = self.table?;
        T::deserialize(table).context("cannot deserialize config")
    }
}

/// A configuration layer.
pub trait Layer {
    /// Merges this layer into `table`, overwriting existing values.
    fn extend_table(&self, table: &mut Table) -> Result<()>;
}

/// A TOML file on disk.
#[must_use]
pub struct File {
    path: PathBuf,
    required: bool,
}

impl File {
    /// The file is required by default.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    /// A missing optional file is treated as empty.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// TOML text, usually embedded defaults.
#[must_use]
pub struct TomlText<'a> {
    text: &'a str,
}

impl<'a> TomlText<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

/// Environment variables starting with a prefix.
///
/// The prefix is stripped and the rest of the name is lowercased. `__` (two
/// underscores) separates nested keys, so with the prefix
/// `TIPSTER_BOOTSTRAP__`, `TIPSTER_BOOTSTRAP__MONGODB__URI` sets
/// `mongodb.uri`.
///
/// All values are strings. Config fields of other types must accept their
/// string form.
#[must_use]
pub struct Env {
    prefix: &'static str,
    vars: Option<Vec<(OsString, OsString)>>,
}

impl Env {
    pub fn prefixed(prefix: &'static str) -> Self {
        Self { prefix, vars: None }
    }

    /// Uses a fixed set of variables instead of the process environment.
    #[cfg(test)]
    pub(crate) fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    fn apply(&self, table: &mut Table, key: OsString, value: OsString) {
        // non-utf8 names can't match any config key
        let Ok(key) = key.into_string() else {
            return;
        };

        let Some(key) = key.strip_prefix(self.prefix) else {
            return;
        };

        let key = key.to_ascii_lowercase();
        let segments = key
            .split("__")
            .filter(|s| !s.is_empty())
            .collect::<SmallVec<[&str; 4]>>();

        if segments.is_empty() {
            return;
        }

        // lossy so the bad value at least shows up in a deserialization error
        let value = value
            .into_string()
            .unwrap_or_else(|o| o.to_string_lossy().into_owned());

        insert_at(table, &segments, Value::String(value));
    }
}

impl Layer for File {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(why) if !self.required && why.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(why) => {
                return Err(why)
                    .with_context(|| format!("cannot read required config {:?}", self.path));
            },
        };

        let file =
            parse_table(&content).with_context(|| format!("failed to load config {:?}", self.path))?;
        merge_tables(table, file);
        Ok(())
    }
}

impl Layer for TomlText<'_> {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let toml = parse_table(self.text).context("embedded toml is invalid")?;
        merge_tables(table, toml);
        Ok(())
    }
}

impl Layer for Env {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        match &self.vars {
            Some(vars) => {
                for (key, value) in vars {
                    self.apply(table, key.clone(), value.clone());
                }
            },
            None => {
                for (key, value) in env::vars_os() {
                    self.apply(table, key, value);
                }
            },
        }

        Ok(())
    }
}

fn parse_table(text: &str) -> Result<Table> {
    toml::from_str(text).context("config toml is invalid")
}

fn merge_tables(target: &mut Table, consume: Table) {
    for (key, value) in consume {
        match target.entry(key) {
            Entry::Vacant(entry) => _ = entry.insert(value),
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Table(a), Value::Table(b)) => merge_tables(a, b),
                (a, b) => *a = b,
            },
        }
    }
}

/// Inserts `value` at the nested `path`, replacing non-table values in the
/// way. `path` must not be empty.
fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = table;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert(Value::Table(Table::new()));

        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }

        current = entry.as_table_mut().expect("just replaced with a table");
    }

    current.insert((*last).to_owned(), value);
}
