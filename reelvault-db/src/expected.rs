//! The expected catalog schema, defined once.
//!
//! Both the creation routine and the validation gate consume these
//! definitions: creation renders them to SQL, validation compares what a
//! file actually contains against them. Keeping a single source prevents
//! "what we create" and "what we accept" from drifting apart.

/// One column of a catalog table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    /// Declared type as reported by `pragma_table_info`, compared verbatim.
    pub decl_type: &'static str,
    /// Column constraints appended after the type when rendering SQL.
    pub constraints: &'static str,
}

/// One catalog table: columns in creation order plus table-level constraints.
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub table_constraints: &'static [&'static str],
}

impl TableDef {
    /// Render the `CREATE TABLE` statement for this definition.
    pub fn create_sql(&self) -> String {
        let mut clauses: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                if col.constraints.is_empty() {
                    format!("{} {}", col.name, col.decl_type)
                } else {
                    format!("{} {} {}", col.name, col.decl_type, col.constraints)
                }
            })
            .collect();
        clauses.extend(self.table_constraints.iter().map(|c| (*c).to_string()));
        format!("CREATE TABLE {} (\n    {}\n);", self.name, clauses.join(",\n    "))
    }

    /// `(name, declared type)` pairs sorted by column name, the shape the
    /// validation gate compares against.
    pub fn sorted_columns(&self) -> Vec<(&'static str, &'static str)> {
        let mut columns: Vec<_> = self
            .columns
            .iter()
            .map(|col| (col.name, col.decl_type))
            .collect();
        columns.sort_unstable();
        columns
    }
}

/// An index the catalog must carry, by exact name.
#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub create_sql: &'static str,
}

/// A trigger the catalog must carry, by exact name.
#[derive(Debug, Clone, Copy)]
pub struct TriggerDef {
    pub name: &'static str,
    pub create_sql: &'static str,
}

/// Catalog tables in creation order.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "tags",
        columns: &[
            ColumnDef {
                name: "tag_id",
                decl_type: "INTEGER",
                constraints: "PRIMARY KEY NOT NULL",
            },
            ColumnDef {
                name: "name",
                decl_type: "TEXT",
                constraints: "NOT NULL",
            },
        ],
        table_constraints: &[],
    },
    TableDef {
        name: "collections",
        columns: &[
            ColumnDef {
                name: "collection_id",
                decl_type: "INTEGER",
                constraints: "PRIMARY KEY NOT NULL",
            },
            ColumnDef {
                name: "title",
                decl_type: "TEXT",
                constraints: "NOT NULL",
            },
        ],
        table_constraints: &[],
    },
    TableDef {
        name: "items",
        columns: &[
            ColumnDef {
                name: "collection_id",
                decl_type: "INTEGER",
                constraints: "NOT NULL",
            },
            ColumnDef {
                name: "item_id",
                decl_type: "INTEGER",
                constraints: "PRIMARY KEY NOT NULL",
            },
            ColumnDef {
                name: "hash",
                decl_type: "VARCHAR(64)",
                constraints: "NOT NULL",
            },
            ColumnDef {
                name: "ext",
                decl_type: "TEXT",
                constraints: "NOT NULL",
            },
        ],
        table_constraints: &[
            "FOREIGN KEY (collection_id) REFERENCES collections(collection_id)",
        ],
    },
    TableDef {
        name: "collection_tag",
        columns: &[
            ColumnDef {
                name: "collection_id",
                decl_type: "INTEGER",
                constraints: "NOT NULL",
            },
            ColumnDef {
                name: "tag_id",
                decl_type: "INTEGER",
                constraints: "NOT NULL",
            },
        ],
        table_constraints: &[
            "PRIMARY KEY (collection_id, tag_id)",
            "FOREIGN KEY (collection_id) REFERENCES collections(collection_id)",
            "FOREIGN KEY (tag_id) REFERENCES tags(tag_id)",
        ],
    },
];

/// Name of the full-text virtual table over collection titles. Its shadow
/// tables all share this prefix.
pub const FTS_TABLE: &str = "title_fts";

/// External-content fts5 table mirroring `collections.title`.
pub const FTS_CREATE_SQL: &str = "CREATE VIRTUAL TABLE title_fts USING fts5(
    title,
    content='collections',
    content_rowid='collection_id'
);";

/// How many `title_fts%` tables the fts5 engine materializes for the virtual
/// table above (the logical table plus data, idx, docsize, and config).
pub const FTS_SHADOW_TABLE_COUNT: i64 = 5;

pub const INDICES: &[IndexDef] = &[
    IndexDef {
        name: "hash_index",
        create_sql: "CREATE UNIQUE INDEX hash_index ON items (hash);",
    },
    IndexDef {
        name: "tag_index",
        create_sql: "CREATE UNIQUE INDEX tag_index ON tags (name);",
    },
];

/// Triggers keeping `title_fts` in sync with committed collection titles.
/// Deletions use the fts5 external-content 'delete' command form.
pub const TRIGGERS: &[TriggerDef] = &[
    TriggerDef {
        name: "title_insert",
        create_sql: "CREATE TRIGGER title_insert AFTER INSERT ON collections
BEGIN
    INSERT INTO title_fts(rowid, title) VALUES (new.collection_id, new.title);
END;",
    },
    TriggerDef {
        name: "title_delete",
        create_sql: "CREATE TRIGGER title_delete AFTER DELETE ON collections
BEGIN
    INSERT INTO title_fts(title_fts, rowid, title)
        VALUES('delete', old.collection_id, old.title);
END;",
    },
    TriggerDef {
        name: "title_update",
        create_sql: "CREATE TRIGGER title_update AFTER UPDATE ON collections
BEGIN
    INSERT INTO title_fts(title_fts, rowid, title)
        VALUES('delete', old.collection_id, old.title);
    INSERT INTO title_fts(rowid, title) VALUES (new.collection_id, new.title);
END;",
    },
];

/// Table names sorted, the order the validation gate lists them in.
pub fn sorted_table_names() -> Vec<&'static str> {
    let mut names: Vec<_> = TABLES.iter().map(|table| table.name).collect();
    names.sort_unstable();
    names
}

/// Index names sorted.
pub fn sorted_index_names() -> Vec<&'static str> {
    let mut names: Vec<_> = INDICES.iter().map(|index| index.name).collect();
    names.sort_unstable();
    names
}

/// Trigger names sorted.
pub fn sorted_trigger_names() -> Vec<&'static str> {
    let mut names: Vec<_> = TRIGGERS.iter().map(|trigger| trigger.name).collect();
    names.sort_unstable();
    names
}

/// The full schema as one SQL batch, in dependency order.
pub fn creation_sql() -> String {
    let mut sql = String::new();
    for table in TABLES {
        sql.push_str(&table.create_sql());
        sql.push('\n');
    }
    sql.push_str(FTS_CREATE_SQL);
    sql.push('\n');
    for index in INDICES {
        sql.push_str(index.create_sql);
        sql.push('\n');
    }
    for trigger in TRIGGERS {
        sql.push_str(trigger.create_sql);
        sql.push('\n');
    }
    sql
}
