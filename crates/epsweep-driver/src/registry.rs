use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use epsweep_core::errors::{ErrorInfo, SweepError};
use epsweep_core::serde::to_canonical_json_bytes;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::SweepReport;

/// Supported registry backends, selected by file extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Registry {
    Csv(PathBuf),
    Sqlite(PathBuf),
}

impl Registry {
    /// Construct a registry handle from a filesystem path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("sqlite") | Some("db") => Registry::Sqlite(path),
            _ => Registry::Csv(path),
        }
    }
}

/// Query descriptor for registry lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Query {
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Table representation returned from registry queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Append one row per job of a [`SweepReport`] to the registry backend.
pub fn registry_append(registry: &Registry, report: &SweepReport) -> Result<(), SweepError> {
    match registry {
        Registry::Csv(path) => append_csv(path, report),
        Registry::Sqlite(path) => append_sqlite(path, report),
    }
}

/// Query the registry returning a structured table.
pub fn registry_query(registry: &Registry, query: &Query) -> Result<Table, SweepError> {
    match registry {
        Registry::Csv(path) => query_csv(path, query),
        Registry::Sqlite(path) => query_sqlite(path, query),
    }
}

fn append_csv(path: &Path, report: &SweepReport) -> Result<(), SweepError> {
    ensure_parent(path)?;
    let file_exists = path.exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("registry-open", "failed to open CSV registry")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    if !file_exists {
        writer
            .write_record(table_columns())
            .map_err(|err| wrap_csv("registry-write-header", err))?;
    }
    for (idx, job) in report.jobs.iter().enumerate() {
        let record = vec![
            report.provenance.created_at.clone(),
            report.provenance.commit.clone(),
            report.plan_name.clone(),
            report.plan_hash.clone(),
            idx.to_string(),
            canonical_string(&job.params)?,
            job.status.as_str().to_string(),
            canonical_string(&Value::from(job.artifacts.clone()))?,
        ];
        writer
            .write_record(&record)
            .map_err(|err| wrap_csv("registry-write-row", err))?;
    }
    writer
        .flush()
        .map_err(|err| wrap_csv("registry-flush", err.into()))?;
    Ok(())
}

fn append_sqlite(path: &Path, report: &SweepReport) -> Result<(), SweepError> {
    ensure_parent(path)?;
    let mut conn = Connection::open(path).map_err(|err| {
        SweepError::Io(
            ErrorInfo::new("registry-sqlite-open", "failed to open sqlite registry")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    conn.execute_batch(
        r#"CREATE TABLE IF NOT EXISTS runs (
            date TEXT NOT NULL,
            "commit" TEXT NOT NULL,
            plan_name TEXT NOT NULL,
            plan_hash TEXT NOT NULL,
            job_id INTEGER NOT NULL,
            params TEXT NOT NULL,
            status TEXT NOT NULL,
            artifacts TEXT NOT NULL
        );"#,
    )
    .map_err(|err| wrap_sqlite("registry-sqlite-schema", err))?;
    let tx = conn
        .transaction()
        .map_err(|err| wrap_sqlite("registry-sqlite-transaction", err))?;
    for (idx, job) in report.jobs.iter().enumerate() {
        tx.execute(
            r#"INSERT INTO runs (date, "commit", plan_name, plan_hash, job_id, params, status, artifacts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &report.provenance.created_at,
                &report.provenance.commit,
                &report.plan_name,
                &report.plan_hash,
                idx as i64,
                canonical_string(&job.params)?,
                job.status.as_str(),
                canonical_string(&Value::from(job.artifacts.clone()))?,
            ],
        )
        .map_err(|err| wrap_sqlite("registry-sqlite-insert", err))?;
    }
    tx.commit()
        .map_err(|err| wrap_sqlite("registry-sqlite-commit", err))?;
    Ok(())
}

fn query_csv(path: &Path, query: &Query) -> Result<Table, SweepError> {
    if !path.exists() {
        return Ok(empty_table());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| wrap_csv("registry-read", err))?;
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| wrap_csv("registry-record", err))?;
        if let Some(plan) = &query.plan_name {
            if record.get(2) != Some(plan) {
                continue;
            }
        }
        rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        if let Some(limit) = query.limit {
            if rows.len() >= limit {
                break;
            }
        }
    }
    Ok(Table {
        columns: table_columns(),
        rows,
    })
}

fn query_sqlite(path: &Path, query: &Query) -> Result<Table, SweepError> {
    if !path.exists() {
        return Ok(empty_table());
    }
    let conn = Connection::open(path).map_err(|err| wrap_sqlite("registry-sqlite-open", err))?;
    let mut sql = r#"SELECT date, "commit", plan_name, plan_hash, job_id, params, status, artifacts FROM runs"#
        .to_string();
    if query.plan_name.is_some() {
        sql.push_str(" WHERE plan_name = ?1");
    }
    sql.push_str(" ORDER BY date, plan_name, job_id");
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| wrap_sqlite("registry-sqlite-prepare", err))?;
    let mut rows_iter = if let Some(plan) = &query.plan_name {
        stmt.query([plan])
    } else {
        stmt.query([])
    }
    .map_err(|err| wrap_sqlite("registry-sqlite-query", err))?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter
        .next()
        .map_err(|err| wrap_sqlite("registry-sqlite-row", err))?
    {
        let mut result = Vec::new();
        for idx in 0..table_columns().len() {
            let value: String = if idx == 4 {
                let id: i64 = row
                    .get(idx)
                    .map_err(|err| wrap_sqlite("registry-sqlite-get", err))?;
                id.to_string()
            } else {
                row.get(idx)
                    .map_err(|err| wrap_sqlite("registry-sqlite-get", err))?
            };
            result.push(value);
        }
        rows.push(result);
    }
    Ok(Table {
        columns: table_columns(),
        rows,
    })
}

fn canonical_string(value: &Value) -> Result<String, SweepError> {
    let bytes = to_canonical_json_bytes(value)?;
    String::from_utf8(bytes).map_err(|err| {
        SweepError::Serde(
            ErrorInfo::new("registry-canonical", "failed to encode canonical json")
                .with_hint(err.to_string()),
        )
    })
}

fn ensure_parent(path: &Path) -> Result<(), SweepError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                SweepError::Io(
                    ErrorInfo::new("registry-create", "failed to create registry directory")
                        .with_context("path", parent.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
        }
    }
    Ok(())
}

fn table_columns() -> Vec<String> {
    vec![
        "date".into(),
        "commit".into(),
        "plan_name".into(),
        "plan_hash".into(),
        "job_id".into(),
        "params".into(),
        "status".into(),
        "artifacts".into(),
    ]
}

fn empty_table() -> Table {
    Table {
        columns: table_columns(),
        rows: Vec::new(),
    }
}

fn wrap_csv(code: &str, err: csv::Error) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, "CSV registry failure").with_hint(err.to_string()))
}

fn wrap_sqlite(code: &str, err: rusqlite::Error) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, "sqlite registry failure").with_hint(err.to_string()))
}
