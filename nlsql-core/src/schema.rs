use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub description: String,
    /// Either `table.column` (same database) or `db.table.column` (cross-database).
    #[serde(default)]
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub db_id: String,
    pub tables: Vec<Table>,
}

impl SchemaDefinition {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Planning,
    Generation,
}

/// Per-database schema descriptors, loaded once at startup from declarative YAML
/// files and held immutable for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, SchemaDefinition>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: SchemaDefinition) {
        self.schemas.insert(schema.db_id.clone(), schema);
    }

    /// Loads one `<db_id>.yaml` file per entry in `dir`. Each file's top-level
    /// document is a `SchemaDefinition` whose `db_id` must match the filename stem.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut catalog = Self::new();
        if !dir.exists() {
            return Ok(catalog);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let contents = std::fs::read_to_string(&path).map_err(|e| CoreError::DeclarativeLoad {
                path: path.display().to_string(),
                source: e.into(),
            })?;
            let schema: SchemaDefinition =
                serde_yaml::from_str(&contents).map_err(|e| CoreError::DeclarativeLoad {
                    path: path.display().to_string(),
                    source: e.into(),
                })?;
            catalog.insert(schema);
        }
        Ok(catalog)
    }

    pub fn list_databases(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schemas.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn schema_for(&self, db_id: &str) -> Result<&SchemaDefinition> {
        self.schemas
            .get(db_id)
            .ok_or_else(|| CoreError::UnknownDatabase(db_id.to_string()))
    }

    pub fn has_table(&self, db_id: &str, table: &str) -> bool {
        self.schemas
            .get(db_id)
            .map(|s| s.has_table(table))
            .unwrap_or(false)
    }

    /// Renders a compact schema excerpt for the requested databases, formatted
    /// differently depending on whether the caller is planning (table-level
    /// overview) or generating SQL (full column detail).
    pub fn format_for_prompt(&self, db_ids: &[String], mode: PromptMode) -> Result<String> {
        let mut out = String::new();
        for db_id in db_ids {
            let schema = self.schema_for(db_id)?;
            out.push_str(&format!("database {db_id}:\n"));
            for table in &schema.tables {
                match mode {
                    PromptMode::Planning => {
                        let cols: Vec<&str> =
                            table.columns.iter().take(5).map(|c| c.name.as_str()).collect();
                        out.push_str(&format!(
                            "  - {} ({}): columns [{}]\n",
                            table.name,
                            table.description,
                            cols.join(", ")
                        ));
                    }
                    PromptMode::Generation => {
                        out.push_str(&format!("  table {} ({})\n", table.name, table.description));
                        for col in &table.columns {
                            let fk = col
                                .foreign_key
                                .as_deref()
                                .map(|f| format!(" -> {f}"))
                                .unwrap_or_default();
                            out.push_str(&format!(
                                "    {} {} {}{}\n",
                                col.name,
                                col.sql_type,
                                if col.nullable { "NULL" } else { "NOT NULL" },
                                fk
                            ));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(dir: &Path, db_id: &str) {
        let yaml = format!(
            "db_id: {db_id}\ntables:\n  - name: customers\n    description: customer records\n    columns:\n      - name: id\n        type: INTEGER\n      - name: name\n        type: TEXT\n"
        );
        let mut f = std::fs::File::create(dir.join(format!("{db_id}.yaml"))).unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
    }

    #[test]
    fn loads_schema_files_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), "customer_db");
        let catalog = SchemaCatalog::load_dir(dir.path()).unwrap();
        assert_eq!(catalog.list_databases(), vec!["customer_db".to_string()]);
        assert!(catalog.has_table("customer_db", "customers"));
    }

    #[test]
    fn missing_database_is_an_error() {
        let catalog = SchemaCatalog::new();
        assert!(catalog.schema_for("nope").is_err());
    }

    #[test]
    fn format_for_prompt_modes_differ() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), "customer_db");
        let catalog = SchemaCatalog::load_dir(dir.path()).unwrap();
        let ids = vec!["customer_db".to_string()];
        let planning = catalog.format_for_prompt(&ids, PromptMode::Planning).unwrap();
        let generation = catalog.format_for_prompt(&ids, PromptMode::Generation).unwrap();
        assert!(planning.contains("columns ["));
        assert!(generation.contains("NOT NULL"));
    }
}
