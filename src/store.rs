// Copyright 2026 Metasearch Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQLite-backed record index executing the backend query descriptors.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use fs2::FileExt;
use levenshtein_automata::DFA;
use levenshtein_automata::Distance;
use levenshtein_automata::LevenshteinAutomatonBuilder;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::backend::Bucket;
use crate::backend::Hit;
use crate::backend::SearchBackend;
use crate::error::Error;
use crate::query::IDENTITY_FIELD;
use crate::query::KEYWORD_SUFFIX;
use crate::query::LookupQuery;
use crate::query::MatchClause;
use crate::query::PROPERTIES_PREFIX;
use crate::query::RESOURCE_NAME_FIELD;
use crate::query::SearchQuery;
use crate::query::TermFilter;

pub struct Store {
    pub conn: Connection,
    pub path: PathBuf,
    lock: Option<StoreLock>,
}

struct StoreLock {
    _file: File,
    path: PathBuf,
    mode: StoreMode,
}

impl StoreLock {
    fn new(file: File, path: PathBuf, mode: StoreMode) -> Self {
        Self {
            _file: file,
            path,
            mode,
        }
    }
}

const SCHEMA_VERSION: i64 = 1;

const SOURCE_TYPE_FIELD: &str = "origin.source.type";
const MAX_EDIT_DISTANCE: u8 = 2;

#[derive(Debug, Clone, Copy)]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub record_count: i64,
    pub identity_count: i64,
    pub duplicate_identities: i64,
    pub db_size_bytes: u64,
}

#[derive(Debug)]
pub struct IntegrityReport {
    pub status: String,
    pub stats: StoreStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: String,
    pub uuid: Option<String>,
    pub source_type: Option<String>,
    pub metadata_url: Option<String>,
    pub resource_name: Option<String>,
    pub properties: Value,
    pub raw_data: Value,
    pub path: String,
}

struct ScanRow {
    uuid: Option<String>,
    source_type: Option<String>,
    metadata_url: Option<String>,
    properties: Value,
}

impl Store {
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("store already exists at {}", path.display());
        }
        let _lock = Self::acquire_lock(path, StoreMode::ReadWrite)?;
        let conn = Self::open_connection(path, StoreMode::ReadWrite)?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        Self::create_schema(&conn)?;
        Self::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        Ok(())
    }

    pub fn open(path: &Path, mode: StoreMode) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("store not found at {}", path.display());
        }
        let lock = Self::acquire_lock(path, mode)?;
        let conn = Self::open_connection(path, mode)?;
        Self::apply_pragmas(&conn, mode)?;
        let version = Self::schema_version(&conn)?;
        if version > SCHEMA_VERSION {
            anyhow::bail!(
                "store schema version {} is newer than supported {}",
                version,
                SCHEMA_VERSION
            );
        }
        if version < SCHEMA_VERSION {
            if matches!(mode, StoreMode::ReadOnly) {
                anyhow::bail!(
                    "store schema version {} needs a migration; reopen for writing",
                    version
                );
            }
            Self::create_schema(&conn)?;
            Self::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        }
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            lock: Some(lock),
        })
    }

    fn open_connection(path: &Path, mode: StoreMode) -> Result<Connection> {
        let flags = match mode {
            StoreMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            StoreMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open {}", path.display()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .context("set busy timeout")?;
        Ok(conn)
    }

    fn apply_pragmas(conn: &Connection, mode: StoreMode) -> Result<()> {
        if matches!(mode, StoreMode::ReadWrite) {
            conn.execute_batch("PRAGMA journal_mode=DELETE;\nPRAGMA synchronous=NORMAL;")
                .context("apply pragmas")?;
        }
        Ok(())
    }

    fn lock_path_for(path: &Path) -> Result<PathBuf> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize());
        let mut dir = std::env::temp_dir();
        dir.push("metasearch");
        fs::create_dir_all(&dir).with_context(|| format!("create lock dir {}", dir.display()))?;
        Ok(dir.join(format!("metasearch-{hash}.lock")))
    }

    fn acquire_lock(path: &Path, mode: StoreMode) -> Result<StoreLock> {
        let lock_path = Self::lock_path_for(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;
        let deadline = Instant::now() + Duration::from_millis(5000);
        loop {
            let locked = match mode {
                StoreMode::ReadOnly => FileExt::try_lock_shared(&file),
                StoreMode::ReadWrite => FileExt::try_lock_exclusive(&file),
            };
            match locked {
                Ok(()) => return Ok(StoreLock::new(file, lock_path, mode)),
                Err(_) if Instant::now() >= deadline => {
                    let mode_label = match mode {
                        StoreMode::ReadOnly => "read",
                        StoreMode::ReadWrite => "write",
                    };
                    anyhow::bail!(
                        "store is locked for {mode_label} access; another process may be using {}",
                        path.display()
                    );
                }
                Err(_) => {
                    sleep(Duration::from_millis(50));
                }
            }
        }
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (\n  key TEXT PRIMARY KEY,\n  value TEXT\n);\n\nCREATE TABLE IF NOT EXISTS record (\n  rowid INTEGER PRIMARY KEY,\n  id TEXT UNIQUE,\n  uuid TEXT,\n  source_type TEXT,\n  metadata_url TEXT,\n  resource_name TEXT,\n  properties TEXT,\n  raw_data TEXT,\n  path TEXT,\n  deleted INTEGER DEFAULT 0\n);\n\nCREATE INDEX IF NOT EXISTS idx_record_uuid ON record(uuid);\nCREATE INDEX IF NOT EXISTS idx_record_path ON record(path);\nCREATE INDEX IF NOT EXISTS idx_record_resource ON record(resource_name);",
        )
        .context("create schema")?;
        Ok(())
    }

    fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .context("set meta")?;
        Ok(())
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![name],
                |row| row.get(0),
            )
            .context("check table")?;
        Ok(count > 0)
    }

    fn schema_version(conn: &Connection) -> Result<i64> {
        if !Self::table_exists(conn, "meta")? {
            return Ok(0);
        }
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key='schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("read schema_version")?;
        Ok(value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0))
    }

    /// Inserts or refreshes a record, keeping its original position.
    pub fn upsert_record(&self, record: &RecordRow) -> Result<()> {
        let properties = serde_json::to_string(&record.properties)?;
        let raw_data = serde_json::to_string(&record.raw_data)?;
        self.conn
            .execute(
                "INSERT INTO record (id, uuid, source_type, metadata_url, resource_name, properties, raw_data, path, deleted)\n             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)\n             ON CONFLICT(id) DO UPDATE SET uuid=excluded.uuid, source_type=excluded.source_type,\n               metadata_url=excluded.metadata_url, resource_name=excluded.resource_name,\n               properties=excluded.properties, raw_data=excluded.raw_data, path=excluded.path, deleted=0",
                params![
                    record.id,
                    record.uuid,
                    record.source_type,
                    record.metadata_url,
                    record.resource_name,
                    properties,
                    raw_data,
                    record.path
                ],
            )
            .with_context(|| format!("upsert record {}", record.id))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let record_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM record WHERE deleted=0", [], |row| {
                row.get(0)
            })
            .context("count records")?;
        let identity_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT uuid) FROM record WHERE deleted=0 AND uuid IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .context("count identities")?;
        let duplicate_identities: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM (\n                   SELECT uuid FROM record WHERE deleted=0 AND uuid IS NOT NULL\n                   GROUP BY uuid HAVING COUNT(*) > 1\n                 )",
                [],
                |row| row.get(0),
            )
            .context("count duplicate identities")?;
        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        Ok(StoreStats {
            record_count,
            identity_count,
            duplicate_identities,
            db_size_bytes,
        })
    }

    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let status: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .context("integrity_check")?;
        let stats = self.stats()?;
        Ok(IntegrityReport { status, stats })
    }

    pub fn compact(&self) -> Result<()> {
        self.conn.execute("DELETE FROM record WHERE deleted=1", [])?;
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    pub fn mark_path_deleted(&self, path: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE record SET deleted=1 WHERE path = ?1 AND deleted=0",
            params![path],
        )?;
        Ok(())
    }

    pub fn remove_by_uuid(&self, uuid: &str) -> Result<usize> {
        let updated = self.conn.execute(
            "UPDATE record SET deleted=1 WHERE uuid = ?1 AND deleted=0",
            params![uuid],
        )?;
        Ok(updated)
    }

    fn scan(&self, filters: &[TermFilter]) -> Result<Vec<ScanRow>> {
        let mut clauses = vec!["record.deleted=0".to_string()];
        let mut values: Vec<SqlValue> = Vec::new();
        for filter in filters {
            let (clause, params) = filter_to_sql(filter);
            clauses.push(clause);
            values.extend(params);
        }
        let sql = format!(
            "SELECT uuid, source_type, metadata_url, properties FROM record\n         WHERE {}\n         ORDER BY rowid ASC",
            clauses.join(" AND ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            let properties: Option<String> = row.get(3)?;
            Ok(ScanRow {
                uuid: row.get(0)?,
                source_type: row.get(1)?,
                metadata_url: row.get(2)?,
                properties: properties
                    .and_then(|text| serde_json::from_str(&text).ok())
                    .unwrap_or(Value::Null),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn run_aggregate(&self, query: &SearchQuery) -> Result<Vec<Bucket>> {
        let rows = self.scan(&query.filters)?;
        let scorer = TermScorer::new(&query.matcher);
        let mut groups: HashMap<String, (f64, u64)> = HashMap::new();
        for row in rows {
            let Some(score) = scorer.score(&row.properties) else {
                continue;
            };
            let Some(key) = bucket_key(&row) else {
                continue;
            };
            let entry = groups.entry(key).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
        let mut buckets: Vec<Bucket> = groups
            .into_iter()
            .map(|(key, (sum, count))| Bucket {
                key,
                score: sum / count as f64,
                doc_count: count,
            })
            .collect();
        buckets.sort_by(|a, b| {
            let ord = b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal);
            if ord == Ordering::Equal {
                a.key.cmp(&b.key)
            } else {
                ord
            }
        });
        buckets.truncate(query.aggregation.size);
        Ok(buckets)
    }

    fn run_lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>> {
        let Some(column) = origin_column(&query.field) else {
            return Ok(Vec::new());
        };
        let sql = format!(
            "SELECT raw_data, resource_name FROM record WHERE deleted=0 AND {column} = ?1 ORDER BY rowid ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query.identity], |row| {
            let raw: Option<String> = row.get(0)?;
            let resource_name: Option<String> = row.get(1)?;
            Ok((raw, resource_name))
        })?;
        let mut hits = Vec::new();
        for row in rows {
            let (raw, resource_name) = row?;
            let raw_data = match raw {
                Some(text) => serde_json::from_str(&text)
                    .with_context(|| format!("decode raw_data for {}", query.identity))?,
                None => Value::Null,
            };
            hits.push(Hit {
                raw_data,
                resource_name,
            });
        }
        Ok(hits)
    }
}

impl SearchBackend for Store {
    fn aggregate(&self, query: &SearchQuery) -> crate::Result<Vec<Bucket>> {
        self.run_aggregate(query)
            .map_err(|err| Error::backend(format!("{err:#}")))
    }

    fn lookup(&self, query: &LookupQuery) -> crate::Result<Vec<Hit>> {
        self.run_lookup(query)
            .map_err(|err| Error::backend(format!("{err:#}")))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            let path = lock.path.clone();
            let mode = lock.mode;
            drop(lock);
            if matches!(mode, StoreMode::ReadWrite) {
                let _ = fs::remove_file(path);
            }
        }
    }
}

fn origin_column(field: &str) -> Option<&'static str> {
    match field {
        IDENTITY_FIELD => Some("record.uuid"),
        RESOURCE_NAME_FIELD => Some("record.resource_name"),
        SOURCE_TYPE_FIELD => Some("record.source_type"),
        _ => None,
    }
}

// `properties.X` and its `.keyword` variant address the same stored value.
fn filter_to_sql(filter: &TermFilter) -> (String, Vec<SqlValue>) {
    if let Some(column) = origin_column(&filter.field) {
        return (
            format!("{column} = ?"),
            vec![SqlValue::from(filter.value.clone())],
        );
    }
    let Some(property) = filter.field.strip_prefix(PROPERTIES_PREFIX) else {
        return ("0".to_string(), Vec::new());
    };
    let property = property.strip_suffix(KEYWORD_SUFFIX).unwrap_or(property);
    let json_path = format!("$.\"{}\"", property.replace('"', "\\\""));
    (
        "EXISTS (SELECT 1 FROM json_each(record.properties, ?) WHERE json_each.value = ?)"
            .to_string(),
        vec![SqlValue::from(json_path), SqlValue::from(filter.value.clone())],
    )
}

/// Mirrors the backend key script: WFS layers group by their metadata URL,
/// catalog records by uuid, anything else produces no bucket.
fn bucket_key(row: &ScanRow) -> Option<String> {
    match row.source_type.as_deref() {
        Some("wfs") => row.metadata_url.clone(),
        Some("geonet") => row.uuid.clone(),
        _ => None,
    }
}

struct TermScorer {
    terms: Vec<(usize, DFA)>,
    fields: Vec<String>,
    threshold: f64,
}

impl TermScorer {
    fn new(matcher: &MatchClause) -> Self {
        let MatchClause::MultiMatch {
            query,
            fields,
            fuzziness,
        } = matcher
        else {
            return Self {
                terms: Vec::new(),
                fields: Vec::new(),
                threshold: 0.0,
            };
        };
        let builder = LevenshteinAutomatonBuilder::new(MAX_EDIT_DISTANCE, true);
        let terms = tokenize(query)
            .iter()
            .map(|term| (term.chars().count(), builder.build_dfa(term)))
            .collect();
        Self {
            terms,
            fields: fields.clone(),
            threshold: f64::from(*fuzziness),
        }
    }

    /// `None` when the record does not match at all.
    fn score(&self, properties: &Value) -> Option<f64> {
        if self.terms.is_empty() {
            return Some(1.0);
        }
        let tokens = field_tokens(properties, &self.fields);
        let mut score = 0.0;
        let mut matched = false;
        for (len, dfa) in &self.terms {
            let best = tokens
                .iter()
                .map(|token| similarity(dfa, *len, token))
                .fold(0.0_f64, f64::max);
            if best >= self.threshold && best > 0.0 {
                score += best;
                matched = true;
            }
        }
        matched.then_some(score)
    }
}

fn field_tokens(properties: &Value, fields: &[String]) -> Vec<String> {
    let Some(map) = properties.as_object() else {
        return Vec::new();
    };
    let mut tokens = Vec::new();
    let mut push_value = |value: &Value| collect_text(value, &mut tokens);
    if fields.is_empty() {
        map.values().for_each(&mut push_value);
        return tokens;
    }
    for field in fields {
        let name = field.strip_prefix(PROPERTIES_PREFIX).unwrap_or(field);
        if let Some(value) = map.get(name) {
            push_value(value);
        }
    }
    tokens
}

fn collect_text(value: &Value, tokens: &mut Vec<String>) {
    match value {
        Value::String(s) => tokens.extend(tokenize(s)),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, tokens)),
        _ => {}
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// `1 - distance / longest` in `[0, 1]`; tokens further than
/// `MAX_EDIT_DISTANCE` away score zero.
fn similarity(dfa: &DFA, term_len: usize, token: &str) -> f64 {
    let longest = term_len.max(token.chars().count());
    if longest == 0 {
        return 1.0;
    }
    match dfa.eval(token) {
        Distance::Exact(distance) => 1.0 - f64::from(distance) / longest as f64,
        Distance::AtLeast(_) => 0.0,
    }
}
