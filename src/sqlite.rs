use std::path::PathBuf;

/// Default store file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "example.db";

/// Name of the table holding user records.
pub const USERS_TABLE: &str = "users";

/// Schema definition for the SQLite database
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }
    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }
}

impl Default for Schema {
    /// The `users` table and nothing else.
    fn default() -> Self {
        Self::new().add_table(TableDefinition::users())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// `users(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL,
    /// age INTEGER NOT NULL, role TEXT NOT NULL)`
    pub fn users() -> Self {
        Self::new(USERS_TABLE)
            .with_column(
                ColumnDefinition::new("id", DataType::Integer)
                    .with_constraint(ColumnConstraint::PrimaryKey)
                    .with_constraint(ColumnConstraint::AutoIncrement),
            )
            .with_column(
                ColumnDefinition::new("name", DataType::Text)
                    .with_constraint(ColumnConstraint::NotNull),
            )
            .with_column(
                ColumnDefinition::new("age", DataType::Integer)
                    .with_constraint(ColumnConstraint::NotNull),
            )
            .with_column(
                ColumnDefinition::new("role", DataType::Text)
                    .with_constraint(ColumnConstraint::NotNull),
            )
    }

    /// DDL that creates the table only when it is missing.
    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({});", self.name, columns)
    }

    /// Compare an existing table layout, as `(name, declared type)` pairs in
    /// column order, against this definition. Returns a description of the
    /// first difference.
    pub fn layout_mismatch(&self, existing: &[(String, String)]) -> Option<String> {
        if existing.len() != self.columns.len() {
            return Some(format!(
                "expected {} columns, found {}",
                self.columns.len(),
                existing.len()
            ));
        }
        for (column, (name, declared)) in self.columns.iter().zip(existing) {
            if !column.name.eq_ignore_ascii_case(name) {
                return Some(format!("expected column `{}`, found `{}`", column.name, name));
            }
            if !column.data_type.as_sql().eq_ignore_ascii_case(declared.trim()) {
                return Some(format!(
                    "column `{}` is declared `{}`, expected `{}`",
                    name,
                    declared,
                    column.data_type.as_sql()
                ));
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.data_type.as_sql());
        for constraint in &self.constraints {
            sql.push(' ');
            sql.push_str(constraint.as_sql());
        }
        sql
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
}

impl DataType {
    pub fn as_sql(self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
        }
    }
}

/// Column constraints, rendered in declaration order. `AutoIncrement` is only
/// valid directly after `PrimaryKey` on an INTEGER column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    AutoIncrement,
    NotNull,
}

impl ColumnConstraint {
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnConstraint::PrimaryKey => "PRIMARY KEY",
            ColumnConstraint::AutoIncrement => "AUTOINCREMENT",
            ColumnConstraint::NotNull => "NOT NULL",
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Schema definition for the database
    pub schema: Schema,
    /// Open without write access; schema creation and seeding will fail.
    pub read_only: bool,
}

impl StoreConfig {
    /// Create a new config with path and schema
    pub fn new(db_path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
            read_only: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH, Schema::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, t)| (n.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn users_ddl() {
        assert_eq!(
            TableDefinition::users().create_statement(),
            "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name TEXT NOT NULL, age INTEGER NOT NULL, role TEXT NOT NULL);"
        );
    }

    #[test]
    fn matching_layout_is_accepted_case_insensitively() {
        let existing = layout(&[
            ("id", "integer"),
            ("name", "TEXT"),
            ("age", "INTEGER"),
            ("role", "text"),
        ]);
        assert_eq!(TableDefinition::users().layout_mismatch(&existing), None);
    }

    #[test]
    fn conflicting_layouts_are_described() {
        let users = TableDefinition::users();

        let short = layout(&[("id", "INTEGER"), ("name", "TEXT")]);
        assert_eq!(
            users.layout_mismatch(&short).as_deref(),
            Some("expected 4 columns, found 2")
        );

        let renamed = layout(&[
            ("id", "INTEGER"),
            ("name", "TEXT"),
            ("age", "INTEGER"),
            ("rol", "TEXT"),
        ]);
        assert_eq!(
            users.layout_mismatch(&renamed).as_deref(),
            Some("expected column `role`, found `rol`")
        );

        let retyped = layout(&[
            ("id", "INTEGER"),
            ("name", "BLOB"),
            ("age", "INTEGER"),
            ("role", "TEXT"),
        ]);
        assert_eq!(
            users.layout_mismatch(&retyped).as_deref(),
            Some("column `name` is declared `BLOB`, expected `TEXT`")
        );
    }

    #[test]
    fn default_config_points_at_example_db() {
        let config = StoreConfig::default();
        assert_eq!(config.db_path, PathBuf::from("example.db"));
        assert!(!config.read_only);
        assert_eq!(config.schema.tables, vec![TableDefinition::users()]);
    }
}
