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

//! Loading catalog records from JSON files into the store.

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use walkdir::WalkDir;

use crate::store::RecordRow;
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub glob: Option<String>,
    pub ignore: Vec<String>,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_read: usize,
    pub records_added: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordFormat {
    Json,
    Lines,
}

pub fn ingest_paths(store: &Store, paths: Vec<PathBuf>, opts: &IngestOptions) -> Result<IngestReport> {
    let include_set = build_globset(opts.glob.as_deref())?;
    let ignore_set = build_ignore_set(&opts.ignore)?;

    let mut report = IngestReport::default();

    for path in resolve_paths(paths) {
        if path.is_file() {
            ingest_file(store, &path, &include_set, &ignore_set, &mut report)?;
        } else if path.is_dir() {
            for entry in WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    ingest_file(store, entry.path(), &include_set, &ignore_set, &mut report)?;
                }
            }
        } else {
            report
                .warnings
                .push(format!("path not found: {}", path.display()));
        }
    }

    tracing::info!(
        files = report.files_read,
        records = report.records_added,
        warnings = report.warnings.len(),
        "ingest finished"
    );
    Ok(report)
}

fn resolve_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    }
}

fn build_globset(pattern: Option<&str>) -> Result<Option<GlobSet>> {
    if let Some(pat) = pattern {
        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new(pat)?);
        let set = builder.build()?;
        Ok(Some(set))
    } else {
        Ok(None)
    }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

fn record_format(path: &Path) -> Option<RecordFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "json" => Some(RecordFormat::Json),
        "jsonl" | "ndjson" => Some(RecordFormat::Lines),
        _ => None,
    }
}

fn ingest_file(
    store: &Store,
    path: &Path,
    include_set: &Option<GlobSet>,
    ignore_set: &GlobSet,
    report: &mut IngestReport,
) -> Result<()> {
    if !ignore_set.is_empty() && ignore_set.is_match(path) {
        return Ok(());
    }
    if let Some(set) = include_set
        && !set.is_match(path)
    {
        return Ok(());
    }
    let Some(format) = record_format(path) else {
        return Ok(());
    };

    let path_str = path.to_string_lossy();
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => {
            report
                .warnings
                .push(format!("skip non-text file: {path_str}"));
            return Ok(());
        }
    };

    let values: Vec<(usize, Value)> = match format {
        RecordFormat::Json => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items.into_iter().enumerate().collect(),
            Ok(value) => vec![(0, value)],
            Err(err) => {
                report.warnings.push(format!("{path_str}: invalid JSON: {err}"));
                return Ok(());
            }
        },
        RecordFormat::Lines => {
            let mut out = Vec::new();
            for (idx, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => out.push((idx, value)),
                    Err(err) => report
                        .warnings
                        .push(format!("{path_str}:{}: invalid JSON: {err}", idx + 1)),
                }
            }
            out
        }
    };

    store
        .mark_path_deleted(&path_str)
        .with_context(|| format!("replace records of {path_str}"))?;
    report.files_read += 1;

    for (idx, value) in values {
        let id = sha256_hex(format!("{path_str}\0{idx}").as_bytes());
        match parse_record(id, &path_str, value) {
            Ok(record) => {
                store.upsert_record(&record)?;
                report.records_added += 1;
            }
            Err(reason) => report
                .warnings
                .push(format!("{path_str}[{idx}]: {reason}")),
        }
    }

    Ok(())
}

fn parse_record(id: String, path: &str, value: Value) -> std::result::Result<RecordRow, String> {
    let Value::Object(mut map) = value else {
        return Err("record is not an object".to_string());
    };
    let origin = map
        .remove("origin")
        .filter(Value::is_object)
        .ok_or_else(|| "record has no origin object".to_string())?;
    let raw_data = map
        .remove("raw_data")
        .filter(Value::is_object)
        .ok_or_else(|| "record has no raw_data object".to_string())?;
    let properties = map
        .remove("properties")
        .unwrap_or_else(|| Value::Object(Default::default()));

    let text_at = |pointer: &str| {
        origin
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    Ok(RecordRow {
        id,
        uuid: text_at("/uuid"),
        source_type: text_at("/source/type"),
        metadata_url: text_at("/resource/metadata_url"),
        resource_name: text_at("/resource/name"),
        properties,
        raw_data,
        path: path.to_string(),
    })
}

fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();
    hex::encode(digest)
}
