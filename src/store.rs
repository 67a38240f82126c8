use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::sqlite::{Schema, StoreConfig, USERS_TABLE};

/// First line printed by [`render`].
pub const HEADER: &str = "------ Usuarios en la base de datos ------";

/// Records inserted on every run. There is no guard against repeats, so each
/// run appends another copy with fresh ids.
pub const SEED_BATCH: [NewUser<'static>; 4] = [
    NewUser::new("Basir", 15, "normal"),
    NewUser::new("Ana", 25, "admin"),
    NewUser::new("Luis", 35, "normal"),
    NewUser::new("Maria", 28, "admin"),
];

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub role: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User -> {} | Age -> {} | Rol -> {}",
            self.name, self.age, self.role
        )
    }
}

/// A user awaiting insertion; the store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub age: i64,
    pub role: &'a str,
}

impl<'a> NewUser<'a> {
    pub const fn new(name: &'a str, age: i64, role: &'a str) -> Self {
        Self { name, age, role }
    }
}

/// Owns the single connection to a users store for the length of a run.
///
/// Dropping the store releases the connection; [`RecordStore::close`] does the
/// same but reports a failure to release.
pub struct RecordStore {
    conn: Connection,
    path: PathBuf,
    schema: Schema,
}

impl RecordStore {
    /// Open the store file at `config.db_path`, creating it unless the config
    /// asks for read-only access.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = config.db_path.clone();
        let flags = if config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let unavailable = |source: rusqlite::Error| StoreError::StorageUnavailable {
            path: path.clone(),
            source,
        };
        let conn = Connection::open_with_flags(&path, flags).map_err(unavailable)?;
        // SQLite reads the file header lazily; touch it so a corrupt or
        // non-database file fails here rather than at the first statement.
        conn.pragma_query_value(None, "schema_version", |row| row.get::<_, i64>(0))
            .map_err(unavailable)?;
        info!(path = %path.display(), read_only = config.read_only, "opened record store");
        Ok(Self {
            conn,
            path,
            schema: config.schema.clone(),
        })
    }

    /// Create every table in the schema that does not exist yet, then check
    /// that existing tables have the expected columns. Existing rows are never
    /// touched.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        for table in &self.schema.tables {
            let schema_err = |source: rusqlite::Error| StoreError::Schema {
                table: table.name.clone(),
                source,
            };
            self.conn
                .execute_batch(&table.create_statement())
                .map_err(schema_err)?;

            let existing = self.table_layout(&table.name).map_err(schema_err)?;
            if let Some(detail) = table.layout_mismatch(&existing) {
                return Err(StoreError::IncompatibleSchema {
                    table: table.name.clone(),
                    detail,
                });
            }
            debug!(table = %table.name, "schema ready");
        }
        Ok(())
    }

    fn table_layout(&self, table: &str) -> rusqlite::Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
    }

    /// Insert `batch` in a single transaction and return the assigned ids in
    /// batch order. Nothing is kept when any row fails.
    pub fn seed(&mut self, batch: &[NewUser<'_>]) -> Result<Vec<i64>, StoreError> {
        let seed_err = |source: rusqlite::Error| StoreError::Seed {
            table: USERS_TABLE.to_string(),
            source,
        };
        let tx = self.conn.transaction().map_err(seed_err)?;
        let mut ids = Vec::with_capacity(batch.len());
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {USERS_TABLE} (name, age, role) VALUES (?1, ?2, ?3)"
                ))
                .map_err(seed_err)?;
            for user in batch {
                let id = stmt
                    .insert(params![user.name, user.age, user.role])
                    .map_err(|source| StoreError::insert(USERS_TABLE, user.name, source))?;
                ids.push(id);
            }
        }
        tx.commit().map_err(seed_err)?;
        info!(count = ids.len(), first_id = ?ids.first(), "seeded users");
        Ok(ids)
    }

    /// Every stored user in ascending id order.
    pub fn fetch_all(&self) -> Result<Vec<User>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, name, age, role FROM {USERS_TABLE} ORDER BY id"
            ))
            .map_err(StoreError::Query)?;
        let users = stmt
            .query_map([], |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    age: row.get(2)?,
                    role: row.get(3)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(StoreError::Query)?;
        debug!(count = users.len(), "fetched users");
        Ok(users)
    }

    /// Release the connection.
    pub fn close(self) -> Result<(), StoreError> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_conn, source)| StoreError::Close(source))?;
        debug!(path = %path.display(), "closed record store");
        Ok(())
    }
}

/// Print the header followed by one line per user.
pub fn render<W: Write>(out: &mut W, users: &[User]) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for user in users {
        writeln!(out, "{user}")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> RecordStore {
        let config = StoreConfig::new(":memory:", Schema::default());
        RecordStore::open(&config).unwrap()
    }

    #[test]
    fn render_format() {
        let users = vec![User {
            id: 2,
            name: "Ana".to_string(),
            age: 25,
            role: "admin".to_string(),
        }];
        let mut out = Vec::new();
        render(&mut out, &users).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "------ Usuarios en la base de datos ------\nUser -> Ana | Age -> 25 | Rol -> admin\n"
        );
    }

    #[test]
    fn render_empty_prints_header_only() {
        let mut out = Vec::new();
        render(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{HEADER}\n"));
    }

    #[test]
    fn seed_assigns_sequential_ids() {
        let mut store = memory_store();
        store.ensure_schema().unwrap();
        assert_eq!(store.seed(&SEED_BATCH).unwrap(), vec![1, 2, 3, 4]);

        let users = store.fetch_all().unwrap();
        assert_eq!(users.len(), 4);
        for (seed, user) in SEED_BATCH.iter().zip(&users) {
            assert_eq!(
                (seed.name, seed.age, seed.role),
                (user.name.as_str(), user.age, user.role.as_str())
            );
        }
        store.close().unwrap();
    }

    #[test]
    fn fetch_without_schema_is_a_query_error() {
        let store = memory_store();
        assert!(matches!(store.fetch_all(), Err(StoreError::Query(_))));
    }

    #[test]
    fn rejected_row_rolls_back_the_batch() {
        let mut store = memory_store();
        store.ensure_schema().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_luis BEFORE INSERT ON users
                 WHEN NEW.name = 'Luis'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        // RAISE(ABORT) fails with SQLITE_CONSTRAINT_TRIGGER.
        let err = store.seed(&SEED_BATCH).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { ref name, .. } if name == "Luis"));
        assert!(store.fetch_all().unwrap().is_empty());
    }
}
