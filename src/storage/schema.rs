//! Relational schema definitions.
//!
//! One table per class tag. Each table has the common `id`/`created_at`/
//! `updated_at` columns, the class's typed columns, and an `extra` JSON
//! column holding any attribute without a dedicated column, along with the
//! record's attribute order. Foreign keys cascade on delete, so removing a
//! parent removes its dependents in the same transaction.

use crate::core::ClassTag;

/// SQLite storage class of a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `TEXT`
    Text,
    /// `INTEGER`
    Integer,
    /// `REAL`
    Real,
}

impl ColumnType {
    const fn sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

/// A typed column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    /// Column name in the table.
    pub column: &'static str,
    /// Attribute name on the in-memory record.
    pub attribute: &'static str,
    /// Storage class.
    pub ty: ColumnType,
    /// Whether `NULL` is allowed.
    pub nullable: bool,
    /// Parent table for a cascading foreign key.
    pub references: Option<ClassTag>,
}

const fn col(column: &'static str, ty: ColumnType, nullable: bool) -> ColumnDef {
    ColumnDef {
        column,
        attribute: column,
        ty,
        nullable,
        references: None,
    }
}

const fn fk(column: &'static str, parent: ClassTag) -> ColumnDef {
    ColumnDef {
        column,
        attribute: column,
        ty: ColumnType::Text,
        nullable: false,
        references: Some(parent),
    }
}

/// A table backing one class.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    /// Class stored in this table.
    pub class: ClassTag,
    /// Typed columns beyond the common ones.
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// Returns the table name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.class.table_name()
    }

    /// Returns the column backing an attribute, if any.
    #[must_use]
    pub fn column_for(&self, attribute: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.attribute == attribute)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement.
    #[must_use]
    pub fn create_sql(&self) -> String {
        let mut lines = vec![
            "    id TEXT PRIMARY KEY NOT NULL".to_string(),
            "    created_at TEXT NOT NULL".to_string(),
            "    updated_at TEXT NOT NULL".to_string(),
        ];
        for c in self.columns {
            let null = if c.nullable { "" } else { " NOT NULL" };
            lines.push(format!("    {} {}{}", c.column, c.ty.sql(), null));
        }
        lines.push("    extra TEXT".to_string());
        for c in self.columns {
            if let Some(parent) = c.references {
                lines.push(format!(
                    "    FOREIGN KEY ({}) REFERENCES {}(id) ON DELETE CASCADE",
                    c.column,
                    parent.table_name()
                ));
            }
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.name(),
            lines.join(",\n")
        )
    }

    /// Index statements for foreign key columns.
    #[must_use]
    pub fn index_sql(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.references.is_some())
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table}({col});",
                    table = self.name(),
                    col = c.column
                )
            })
            .collect()
    }

    /// Column list in select order: common columns, typed columns, `extra`.
    #[must_use]
    pub fn select_columns(&self) -> String {
        let mut cols = vec!["id", "created_at", "updated_at"];
        cols.extend(self.columns.iter().map(|c| c.column));
        cols.push("extra");
        cols.join(", ")
    }

    /// `SELECT` of every row.
    #[must_use]
    pub fn select_all_sql(&self) -> String {
        format!("SELECT {} FROM {} ORDER BY created_at, id", self.select_columns(), self.name())
    }

    /// `SELECT` of one row by id.
    #[must_use]
    pub fn select_one_sql(&self) -> String {
        format!("SELECT {} FROM {} WHERE id = ?1", self.select_columns(), self.name())
    }

    /// `SELECT COUNT(*)`.
    #[must_use]
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name())
    }

    /// Insert-or-update statement.
    ///
    /// Uses `ON CONFLICT DO UPDATE` rather than `REPLACE`: a replace deletes
    /// the old row first, which would fire the cascade on its children.
    /// `created_at` is never overwritten.
    #[must_use]
    pub fn upsert_sql(&self) -> String {
        let cols = self.select_columns();
        let placeholders: Vec<String> = (1..=self.columns.len() + 4).map(|i| format!("?{i}")).collect();
        let mut updates = vec!["updated_at = excluded.updated_at".to_string()];
        updates.extend(
            self.columns
                .iter()
                .map(|c| format!("{col} = excluded.{col}", col = c.column)),
        );
        updates.push("extra = excluded.extra".to_string());
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
            self.name(),
            cols,
            placeholders.join(", "),
            updates.join(", ")
        )
    }

    /// `DELETE` by id.
    #[must_use]
    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = ?1", self.name())
    }

    /// `DROP TABLE IF EXISTS`.
    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name())
    }
}

/// Tables in dependency order: every parent precedes its children.
pub const TABLES: &[TableDef] = &[
    TableDef {
        class: ClassTag::BaseModel,
        columns: &[],
    },
    TableDef {
        class: ClassTag::User,
        columns: &[
            col("email", ColumnType::Text, false),
            ColumnDef {
                column: "password",
                attribute: crate::core::record::SECRET_ATTR,
                ty: ColumnType::Text,
                nullable: false,
                references: None,
            },
            col("first_name", ColumnType::Text, true),
            col("last_name", ColumnType::Text, true),
        ],
    },
    TableDef {
        class: ClassTag::State,
        columns: &[col("name", ColumnType::Text, false)],
    },
    TableDef {
        class: ClassTag::City,
        columns: &[
            col("name", ColumnType::Text, false),
            fk("state_id", ClassTag::State),
        ],
    },
    TableDef {
        class: ClassTag::Amenity,
        columns: &[col("name", ColumnType::Text, false)],
    },
    TableDef {
        class: ClassTag::Place,
        columns: &[
            fk("city_id", ClassTag::City),
            fk("user_id", ClassTag::User),
            col("name", ColumnType::Text, false),
            col("description", ColumnType::Text, true),
            col("number_rooms", ColumnType::Integer, true),
            col("number_bathrooms", ColumnType::Integer, true),
            col("max_guest", ColumnType::Integer, true),
            col("price_by_night", ColumnType::Integer, true),
            col("latitude", ColumnType::Real, true),
            col("longitude", ColumnType::Real, true),
        ],
    },
    TableDef {
        class: ClassTag::Review,
        columns: &[
            fk("place_id", ClassTag::Place),
            fk("user_id", ClassTag::User),
            col("text", ColumnType::Text, false),
        ],
    },
];

/// Returns the table for a class.
#[must_use]
pub fn table_for(class: ClassTag) -> &'static TableDef {
    // TABLES covers every ClassTag; the fallback is unreachable.
    TABLES.iter().find(|t| t.class == class).unwrap_or(&TABLES[0])
}

/// Returns the dependency depth of a class (parents are shallower).
#[must_use]
pub fn depth(class: ClassTag) -> usize {
    table_for(class)
        .columns
        .iter()
        .filter_map(|c| c.references)
        .map(|parent| depth(parent) + 1)
        .max()
        .unwrap_or(0)
}

/// Returns the attribute on `child` that references `parent`, if any.
#[must_use]
pub fn foreign_key(child: ClassTag, parent: ClassTag) -> Option<&'static str> {
    table_for(child)
        .columns
        .iter()
        .find(|c| c.references == Some(parent))
        .map(|c| c.attribute)
}

/// Full idempotent schema creation script.
#[must_use]
pub fn schema_sql() -> String {
    let mut sql = String::new();
    for table in TABLES {
        sql.push_str(&table.create_sql());
        sql.push('\n');
        for index in table.index_sql() {
            sql.push_str(&index);
            sql.push('\n');
        }
    }
    sql
}

/// Script dropping every table, children first.
#[must_use]
pub fn drop_sql() -> String {
    TABLES
        .iter()
        .rev()
        .map(TableDef::drop_sql)
        .collect::<Vec<_>>()
        .join("\n")
}
