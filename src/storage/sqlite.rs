//! `SQLite` storage implementation.
//!
//! The connection is the engine and is opened once. On top of it sits a
//! session: the `new`/`delete` calls staged since the last save. `save`
//! applies the whole session in one transaction and rolls it back on any
//! error. Queries read the tables directly and overlay the session, so a
//! caller always sees its own staged writes. There is no cache.

use crate::config::RelationalConfig;
use crate::core::record::{format_timestamp, parse_timestamp};
use crate::core::{ClassTag, Record};
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    ColumnType, TABLES, TableDef, depth, drop_sql, schema_sql, table_for,
};
use crate::storage::traits::{Backend, Storage};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A change waiting for the next save.
#[derive(Debug, Clone)]
enum Staged {
    /// Insert or update this record.
    Upsert(Record),
    /// Delete the row with this class and id.
    Delete(ClassTag, String),
}

impl Staged {
    const fn class(&self) -> ClassTag {
        match self {
            Self::Upsert(record) => record.class,
            Self::Delete(class, _) => *class,
        }
    }
}

/// Unit of work between two saves.
#[derive(Debug, Default)]
struct Session {
    /// Identity key -> staged change. Later calls replace earlier ones.
    staged: BTreeMap<String, Staged>,
}

/// SQLite-backed relational storage.
///
/// # Examples
///
/// ```no_run
/// use hbnb_store::storage::{SqliteStorage, Storage};
///
/// let mut storage = SqliteStorage::open("hbnb.db").unwrap();
/// storage.reload().unwrap();
/// ```
pub struct SqliteStorage {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
    /// Open session, if any.
    session: Option<Session>,
}

impl SqliteStorage {
    /// Opens or creates a `SQLite` database at the given path.
    ///
    /// The schema is not touched; call [`reload`](Storage::reload) next.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        Self::configure(&conn)?;

        Ok(Self {
            conn,
            path: Some(path),
            session: None,
        })
    }

    /// Creates an in-memory `SQLite` database.
    ///
    /// Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Self::configure(&conn)?;

        Ok(Self {
            conn,
            path: None,
            session: None,
        })
    }

    /// Opens the database described by a relational configuration.
    ///
    /// In test mode every table is dropped before the first session.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or dropped.
    pub fn from_config(config: &RelationalConfig) -> Result<Self> {
        tracing::info!(
            host = %config.host,
            port = config.port,
            user = %config.user,
            database = %config.database,
            test_mode = config.test_mode,
            "opening relational storage"
        );
        let storage = match config.database_path() {
            None => Self::in_memory()?,
            Some(path) => Self::open(path)?,
        };
        if config.test_mode {
            storage.drop_all()?;
        }
        Ok(storage)
    }

    fn configure(conn: &Connection) -> Result<()> {
        // Cascades depend on this being on for every connection
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Drops every table, children first.
    ///
    /// # Errors
    ///
    /// Returns an error if a drop fails.
    pub fn drop_all(&self) -> Result<()> {
        self.conn
            .execute_batch(&drop_sql())
            .map_err(StorageError::from)?;
        tracing::info!("dropped all tables");
        Ok(())
    }

    /// Returns whether a session is open.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the number of staged, unsaved changes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.staged.len())
    }

    fn session_mut(&mut self) -> &mut Session {
        self.session.get_or_insert_with(|| {
            tracing::debug!("opening session");
            Session::default()
        })
    }

    fn staged(&self) -> impl Iterator<Item = (&String, &Staged)> {
        self.session.iter().flat_map(|s| s.staged.iter())
    }

    fn has_staged(&self, class: Option<ClassTag>) -> bool {
        self.staged()
            .any(|(_, change)| class.is_none_or(|c| change.class() == c))
    }

    fn query_table(&self, table: &TableDef, out: &mut BTreeMap<String, Record>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare(&table.select_all_sql())
            .map_err(StorageError::from)?;

        let records = stmt
            .query_map([], |row| row_to_record(table, row))
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        for record in records {
            out.insert(record.identity_key(), record);
        }
        Ok(())
    }

    fn apply(tx: &rusqlite::Transaction<'_>, staged: &[Staged]) -> rusqlite::Result<()> {
        let mut deletes: Vec<(ClassTag, &str)> = Vec::new();
        let mut upserts: Vec<&Record> = Vec::new();
        for change in staged {
            match change {
                Staged::Delete(class, id) => deletes.push((*class, id)),
                Staged::Upsert(record) => upserts.push(record),
            }
        }
        deletes.sort_by_key(|(class, _)| std::cmp::Reverse(depth(*class)));
        upserts.sort_by_key(|record| depth(record.class));

        for (class, id) in deletes {
            tx.execute(&table_for(class).delete_sql(), params![id])?;
        }
        for record in upserts {
            let table = table_for(record.class);
            let values = record_to_row(table, record);
            tx.execute(&table.upsert_sql(), params_from_iter(values.iter()))?;
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn all(&self, class: Option<&str>) -> Result<BTreeMap<String, Record>> {
        let tag = match class {
            None => None,
            Some(name) => match ClassTag::parse(name) {
                Some(tag) => Some(tag),
                None => return Ok(BTreeMap::new()),
            },
        };

        let mut objects = BTreeMap::new();
        match tag {
            Some(tag) => self.query_table(table_for(tag), &mut objects)?,
            None => {
                for table in TABLES {
                    self.query_table(table, &mut objects)?;
                }
            }
        }

        for (key, change) in self.staged() {
            if tag.is_some_and(|t| change.class() != t) {
                continue;
            }
            match change {
                Staged::Upsert(record) => {
                    objects.insert(key.clone(), record.clone());
                }
                Staged::Delete(..) => {
                    objects.remove(key);
                }
            }
        }

        Ok(objects)
    }

    fn get(&self, class: &str, id: &str) -> Result<Option<Record>> {
        let Some(tag) = ClassTag::parse(class) else {
            return Ok(None);
        };

        let key = format!("{tag}.{id}");
        if let Some(change) = self.session.as_ref().and_then(|s| s.staged.get(&key)) {
            return Ok(match change {
                Staged::Upsert(record) => Some(record.clone()),
                Staged::Delete(..) => None,
            });
        }

        let table = table_for(tag);
        let record = self
            .conn
            .query_row(&table.select_one_sql(), params![id], |row| {
                row_to_record(table, row)
            })
            .optional()
            .map_err(StorageError::from)?;

        Ok(record)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&self, class: Option<&str>) -> Result<usize> {
        let tag = match class {
            None => None,
            Some(name) => match ClassTag::parse(name) {
                Some(tag) => Some(tag),
                None => return Ok(0),
            },
        };

        if self.has_staged(tag) {
            return Ok(self.all(class)?.len());
        }

        let mut total = 0usize;
        for table in TABLES.iter().filter(|t| tag.is_none_or(|c| t.class == c)) {
            let count: i64 = self
                .conn
                .query_row(&table.count_sql(), [], |row| row.get(0))
                .map_err(StorageError::from)?;
            total += count as usize;
        }
        Ok(total)
    }

    fn new(&mut self, record: Record) {
        tracing::debug!(key = %record.identity_key(), "staging upsert");
        self.session_mut()
            .staged
            .insert(record.identity_key(), Staged::Upsert(record));
    }

    fn save(&mut self) -> Result<()> {
        let staged: Vec<Staged> = match self.session.as_mut() {
            Some(session) => std::mem::take(&mut session.staged).into_values().collect(),
            None => return Ok(()),
        };
        if staged.is_empty() {
            return Ok(());
        }

        let outcome = self.conn.transaction().and_then(|tx| {
            Self::apply(&tx, &staged)?;
            tx.commit()
        });

        match outcome {
            Ok(()) => {
                tracing::debug!(changes = staged.len(), "session committed");
                Ok(())
            }
            Err(e) => {
                // The transaction rolled back when it was dropped
                tracing::warn!(error = %e, changes = staged.len(), "save failed, session rolled back");
                Err(StorageError::Persistence(e.to_string()).into())
            }
        }
    }

    fn delete(&mut self, record: &Record) -> Result<()> {
        tracing::debug!(key = %record.identity_key(), "staging delete");
        self.session_mut().staged.insert(
            record.identity_key(),
            Staged::Delete(record.class, record.id.clone()),
        );
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.conn
            .execute_batch(&schema_sql())
            .map_err(StorageError::from)?;

        if let Some(old) = self.session.replace(Session::default())
            && !old.staged.is_empty()
        {
            tracing::debug!(discarded = old.staged.len(), "discarding unsaved changes");
        }
        tracing::debug!("schema ready, new session opened");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(old) = self.session.take() {
            tracing::debug!(discarded = old.staged.len(), "session closed");
        }
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Relational
    }
}

/// Maps a row selected with [`TableDef::select_columns`] to a record.
fn row_to_record(table: &TableDef, row: &Row<'_>) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    let mut record = Record::with_id(table.class, id);
    record.created_at = timestamp_column(row, 1)?;
    record.updated_at = timestamp_column(row, 2)?;

    let mut typed = Map::new();
    for (offset, column) in table.columns.iter().enumerate() {
        let value: SqlValue = row.get(offset + 3)?;
        if let Some(json) = sql_to_json(value) {
            typed.insert(column.attribute.to_string(), json);
        }
    }

    // `extra` lists every attribute in insertion order; typed ones hold null
    // there and take their value from the column.
    let extra_idx = table.columns.len() + 3;
    if let Some(extra) = row.get::<_, Option<String>>(extra_idx)? {
        let extra: Map<String, Value> = serde_json::from_str(&extra).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(extra_idx, Type::Text, Box::new(e))
        })?;
        for (key, value) in extra {
            let value = typed.remove(&key).unwrap_or(value);
            record.attributes.insert(key, value);
        }
    }
    record.attributes.extend(typed);

    Ok(record)
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::NaiveDateTime> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Builds the parameter list for [`TableDef::upsert_sql`].
///
/// A value lands in its typed column only if its JSON type matches the
/// column exactly; everything else goes to `extra` so it reads back as-is.
/// `extra` also records the attribute order, with `null` standing in for
/// values held by a typed column.
fn record_to_row(table: &TableDef, record: &Record) -> Vec<SqlValue> {
    let mut values = vec![
        SqlValue::Text(record.id.clone()),
        SqlValue::Text(format_timestamp(&record.created_at)),
        SqlValue::Text(format_timestamp(&record.updated_at)),
    ];

    let mut extra = Map::new();
    for (key, value) in &record.attributes {
        let typed = table
            .column_for(key)
            .is_some_and(|c| json_to_sql(value, c.ty).is_some());
        let held = if typed { Value::Null } else { value.clone() };
        extra.insert(key.clone(), held);
    }

    for column in table.columns {
        let value = record
            .attributes
            .get(column.attribute)
            .and_then(|v| json_to_sql(v, column.ty))
            .unwrap_or(SqlValue::Null);
        values.push(value);
    }

    values.push(if extra.is_empty() {
        SqlValue::Null
    } else {
        SqlValue::Text(Value::Object(extra).to_string())
    });
    values
}

fn json_to_sql(value: &Value, ty: ColumnType) -> Option<SqlValue> {
    match (ty, value) {
        (ColumnType::Text, Value::String(s)) => Some(SqlValue::Text(s.clone())),
        (ColumnType::Integer, Value::Number(n)) => n.as_i64().map(SqlValue::Integer),
        (ColumnType::Real, Value::Number(n)) if n.is_f64() => n.as_f64().map(SqlValue::Real),
        _ => None,
    }
}

fn sql_to_json(value: SqlValue) -> Option<Value> {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => None,
        SqlValue::Integer(i) => Some(Value::Number(i.into())),
        SqlValue::Real(f) => Number::from_f64(f).map(Value::Number),
        SqlValue::Text(s) => Some(Value::String(s)),
    }
}
