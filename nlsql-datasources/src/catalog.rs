use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DatasourceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceSpec {
    /// Only "sqlite" is implemented; the type is kept explicit so a second
    /// engine can be added without reshaping the catalog format.
    pub kind: String,
    /// May contain `${VAR}` or `${VAR:-default}` placeholders resolved against
    /// the process environment at load time.
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub datasource: DatasourceSpec,
}

#[derive(Debug, Clone, Default)]
pub struct DatasourceCatalog {
    entries: Vec<CatalogEntry>,
}

impl DatasourceCatalog {
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, DatasourceError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| DatasourceError::CatalogLoad {
            path: path.display().to_string(),
            source: e.into(),
        })?;
        let mut entries: Vec<CatalogEntry> =
            serde_yaml::from_str(&contents).map_err(|e| DatasourceError::CatalogLoad {
                path: path.display().to_string(),
                source: e.into(),
            })?;
        for entry in &mut entries {
            entry.datasource.path = interpolate_env(&entry.datasource.path);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, db_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == db_id)
    }

    pub fn summaries(&self) -> Vec<nlsql_core::types::DataSourceSummary> {
        self.entries
            .iter()
            .map(|e| nlsql_core::types::DataSourceSummary {
                id: e.id.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
            })
            .collect()
    }
}

/// Resolves `${VAR}` and `${VAR:-default}` against the process environment.
fn interpolate_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            out.push_str("${");
            rest = tail;
            continue;
        };
        let expr = &tail[..end];
        let (var, default) = match expr.split_once(":-") {
            Some((v, d)) => (v, Some(d)),
            None => (expr, None),
        };
        match std::env::var(var) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(default.unwrap_or_default()),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_env_var_with_default() {
        std::env::remove_var("NLSQL_TEST_DS_PATH");
        assert_eq!(interpolate_env("${NLSQL_TEST_DS_PATH:-fallback.db}"), "fallback.db");
        std::env::set_var("NLSQL_TEST_DS_PATH", "custom.db");
        assert_eq!(interpolate_env("${NLSQL_TEST_DS_PATH:-fallback.db}"), "custom.db");
        std::env::remove_var("NLSQL_TEST_DS_PATH");
    }

    #[test]
    fn missing_file_yields_empty_catalog() {
        let catalog = DatasourceCatalog::load(Path::new("/nonexistent.yaml")).unwrap();
        assert!(catalog.entries().is_empty());
    }
}
