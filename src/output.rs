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

use anyhow::Result;
use metasearch::params::SearchParameters;
use metasearch::search::SearchStats;
use metasearch::store::StoreStats;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub took_ms: i64,
    pub total_hits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_identities: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<SearchStats>,
}

impl StatsOut {
    pub fn hits(total_hits: usize) -> Self {
        Self {
            total_hits: total_hits as i64,
            ..Default::default()
        }
    }

    pub fn store(stats: &StoreStats) -> Self {
        Self {
            record_count: Some(stats.record_count),
            identity_count: Some(stats.identity_count),
            duplicate_identities: Some(stats.duplicate_identities),
            db_size_bytes: Some(stats.db_size_bytes),
            ..Default::default()
        }
    }

    pub fn search(stats: SearchStats) -> Self {
        Self {
            took_ms: stats.took_ms,
            total_hits: stats.fetched as i64,
            pipeline: Some(stats),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any: Option<String>,
    pub filters: Value,
    pub fast: bool,
    pub from: usize,
    pub to: usize,
}

impl QueryOut {
    pub fn from_params(params: &SearchParameters) -> Self {
        let filters = [
            ("type", &params.resource_type),
            ("category", &params.category),
            ("conditionapplyingtoaccessanduse", &params.access_condition),
            ("orgname", &params.org_name),
            ("updatefrequency", &params.update_frequency),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), Value::from(v.as_str()))))
        .collect::<serde_json::Map<_, _>>();
        Self {
            any: params.any.clone(),
            filters: Value::Object(filters),
            fast: params.fast,
            from: params.window.from,
            to: params.window.to,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: QueryOut) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_explain(mut self, explain: Value) -> Self {
        self.explain = Some(explain);
        self
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Value) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}
