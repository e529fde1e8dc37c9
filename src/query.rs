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

//! Backend query descriptors.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::params::SearchParameters;
use crate::schema::FieldKind;
use crate::schema::FieldKindLookup;

pub const AGGREGATION_NAME: &str = "metadata";
pub const UNBOUNDED_BUCKETS: usize = 9_999_999;
pub const DEFAULT_FUZZINESS: f32 = 0.7;

pub const IDENTITY_FIELD: &str = "origin.uuid";
pub const RESOURCE_NAME_FIELD: &str = "origin.resource.name";
pub const PROPERTIES_PREFIX: &str = "properties.";
pub const KEYWORD_SUFFIX: &str = ".keyword";

/// Evaluated per record by the backend to derive its bucket key.
pub const IDENTITY_KEY_SCRIPT: &str = "if (params['_source']['origin']['source']['type'] == 'wfs') {\
return doc['origin.resource.metadata_url'].value}\
else if (params['_source']['origin']['source']['type'] == 'geonet') {\
return doc['origin.uuid'].value}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterParam {
    #[serde(rename = "type")]
    ResourceType,
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "conditionapplyingtoaccessanduse")]
    AccessCondition,
    #[serde(rename = "orgname")]
    OrgName,
    #[serde(rename = "updatefrequency")]
    UpdateFrequency,
}

impl FilterParam {
    pub const ALL: [FilterParam; 5] = [
        FilterParam::ResourceType,
        FilterParam::Category,
        FilterParam::AccessCondition,
        FilterParam::OrgName,
        FilterParam::UpdateFrequency,
    ];

    pub fn property(self) -> Option<&'static str> {
        match self {
            FilterParam::ResourceType => None,
            FilterParam::Category => Some("category"),
            FilterParam::AccessCondition => Some("rights"),
            FilterParam::OrgName => Some("publisher"),
            FilterParam::UpdateFrequency => Some("updateFrequency"),
        }
    }

    fn value(self, params: &SearchParameters) -> Option<&str> {
        match self {
            FilterParam::ResourceType => params.resource_type.as_deref(),
            FilterParam::Category => params.category.as_deref(),
            FilterParam::AccessCondition => params.access_condition.as_deref(),
            FilterParam::OrgName => params.org_name.as_deref(),
            FilterParam::UpdateFrequency => params.update_frequency.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub fuzziness: f32,
    pub filters: BTreeSet<FilterParam>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            fuzziness: DEFAULT_FUZZINESS,
            filters: FilterParam::ALL.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchClause {
    All,
    MultiMatch {
        query: String,
        fields: Vec<String>,
        fuzziness: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFilter {
    pub field: String,
    pub value: String,
}

impl TermFilter {
    fn new(field: impl Into<String>, value: &str) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAggregation {
    pub name: String,
    pub key_script: String,
    pub size: usize,
}

impl Default for BucketAggregation {
    fn default() -> Self {
        Self {
            name: AGGREGATION_NAME.to_string(),
            key_script: IDENTITY_KEY_SCRIPT.to_string(),
            size: UNBOUNDED_BUCKETS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub matcher: MatchClause,
    pub filters: Vec<TermFilter>,
    pub aggregation: BucketAggregation,
}

/// Builds the aggregation query for one request. Total over its inputs:
/// garbage filter values simply produce filters that match nothing.
pub fn build_search_query(
    params: &SearchParameters,
    fields: &dyn FieldKindLookup,
    opts: &QueryOptions,
) -> SearchQuery {
    let matcher = match params.any.as_deref() {
        Some(text) => MatchClause::MultiMatch {
            query: text.to_string(),
            fields: fields
                .text_fields()
                .iter()
                .map(|name| format!("{PROPERTIES_PREFIX}{name}"))
                .collect(),
            fuzziness: opts.fuzziness,
        },
        None => MatchClause::All,
    };

    let mut filters = Vec::new();
    for param in FilterParam::ALL {
        if !opts.filters.contains(&param) {
            continue;
        }
        let Some(value) = param.value(params) else {
            continue;
        };
        match param.property() {
            None => filters.push(TermFilter::new(RESOURCE_NAME_FIELD, value)),
            Some(property) => filters.extend(property_filters(property, value, fields)),
        }
    }

    SearchQuery {
        matcher,
        filters,
        aggregation: BucketAggregation::default(),
    }
}

// Emits one filter per kind the lookup reports. A filter on a variant that
// a given collection does not carry is harmless, so both may be present.
fn property_filters(property: &str, value: &str, fields: &dyn FieldKindLookup) -> Vec<TermFilter> {
    let mut out = Vec::with_capacity(2);
    if fields.has_kind(property, FieldKind::Keyword) {
        out.push(TermFilter::new(format!("{PROPERTIES_PREFIX}{property}"), value));
    }
    if fields.has_kind(property, FieldKind::Text) {
        out.push(TermFilter::new(
            format!("{PROPERTIES_PREFIX}{property}{KEYWORD_SUFFIX}"),
            value,
        ));
    }
    out
}

impl SearchQuery {
    pub fn to_dsl(&self) -> Value {
        let filters: Vec<Value> = self
            .filters
            .iter()
            .map(|f| json!({ "term": { f.field.as_str(): f.value } }))
            .collect();
        let mut bool_query = serde_json::Map::new();
        bool_query.insert("filter".into(), Value::Array(filters));
        match &self.matcher {
            MatchClause::All => {
                bool_query.insert("should".into(), json!({ "match_all": {} }));
            }
            MatchClause::MultiMatch {
                query,
                fields,
                fuzziness,
            } => {
                bool_query.insert(
                    "must".into(),
                    json!({
                        "multi_match": {
                            "query": query,
                            "operator": "or",
                            "fuzziness": fuzziness,
                            "fields": fields,
                        }
                    }),
                );
            }
        }

        let mut aggs = serde_json::Map::new();
        aggs.insert(
            self.aggregation.name.clone(),
            json!({
                "aggs": { "avg_score": { "avg": { "script": "_score" } } },
                "terms": {
                    "order": { "avg_score": "desc" },
                    "script": { "lang": "painless", "source": self.aggregation.key_script },
                    "size": self.aggregation.size,
                }
            }),
        );

        json!({
            "size": 0,
            "query": { "bool": Value::Object(bool_query) },
            "aggs": Value::Object(aggs),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub field: String,
    pub identity: String,
    pub source: Vec<String>,
}

impl LookupQuery {
    pub fn for_identity(identity: &str) -> Self {
        Self {
            field: IDENTITY_FIELD.to_string(),
            identity: identity.to_string(),
            source: vec!["raw_data".to_string(), RESOURCE_NAME_FIELD.to_string()],
        }
    }

    pub fn to_dsl(&self) -> Value {
        json!({
            "_source": self.source,
            "query": { "match": { self.field.as_str(): self.identity } },
        })
    }
}
