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

//! One search request, end to end.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::allow::AllowList;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::fetch::FetchOutcome;
use crate::fetch::fast_projection;
use crate::fetch::fetch_document;
use crate::labels::Labels;
use crate::params::SearchParameters;
use crate::query::SearchQuery;
use crate::query::build_search_query;
use crate::resolve::resolve_candidates;
use crate::resolve::select_window;
use crate::response::SearchResponse;
use crate::schema::FieldKindLookup;
use crate::summary::Aggregator;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub took_ms: i64,
    pub buckets: usize,
    pub candidates: usize,
    pub windowed: usize,
    pub fetched: usize,
    pub missing: usize,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: SearchQuery,
    pub response: SearchResponse,
    pub stats: SearchStats,
}

pub struct Searcher<'a> {
    backend: &'a dyn SearchBackend,
    fields: &'a dyn FieldKindLookup,
    allow: Option<&'a dyn AllowList>,
    labels: &'a Labels,
    config: &'a SearchConfig,
}

impl<'a> Searcher<'a> {
    pub fn new(
        backend: &'a dyn SearchBackend,
        fields: &'a dyn FieldKindLookup,
        labels: &'a Labels,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            backend,
            fields,
            allow: None,
            labels,
            config,
        }
    }

    pub fn with_allow_list(mut self, allow: &'a dyn AllowList) -> Self {
        self.allow = Some(allow);
        self
    }

    pub fn search(&self, params: &SearchParameters) -> Result<SearchOutcome> {
        let started = Instant::now();
        let query = build_search_query(params, self.fields, &self.config.query_options());
        let buckets = self.backend.aggregate(&query)?;
        let candidates = resolve_candidates(&buckets, self.allow);
        let window = select_window(&candidates, params.window);

        let aggregator = Aggregator::new(self.labels, &self.config.facets);
        let mut tally = aggregator.new_tally();
        let mut metadata: Vec<Value> = Vec::with_capacity(window.len());
        let mut missing = 0usize;
        for identity in window {
            let doc = match fetch_document(self.backend, identity)? {
                FetchOutcome::Found(doc) => doc,
                FetchOutcome::Missing => {
                    missing += 1;
                    continue;
                }
            };
            aggregator.fold(&mut tally, &doc)?;
            metadata.push(if params.fast {
                fast_projection(&doc.raw_data)
            } else {
                doc.raw_data
            });
        }

        let stats = SearchStats {
            took_ms: started.elapsed().as_millis() as i64,
            buckets: buckets.len(),
            candidates: candidates.len(),
            windowed: window.len(),
            fetched: metadata.len(),
            missing,
        };
        tracing::debug!(
            buckets = stats.buckets,
            candidates = stats.candidates,
            windowed = stats.windowed,
            fetched = stats.fetched,
            missing = stats.missing,
            took_ms = stats.took_ms,
            "search finished"
        );

        let response =
            SearchResponse::assemble(params.window, self.config.echo_to, metadata, tally);
        Ok(SearchOutcome {
            query,
            response,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::Bucket;
    use crate::backend::Hit;
    use crate::error::Error;
    use crate::params::Window;
    use crate::query::LookupQuery;
    use crate::schema::FieldKinds;

    struct Fixed {
        buckets: Vec<Bucket>,
        fail_aggregate: bool,
    }

    impl SearchBackend for Fixed {
        fn aggregate(&self, _query: &SearchQuery) -> Result<Vec<Bucket>> {
            if self.fail_aggregate {
                return Err(Error::backend("connection refused"));
            }
            Ok(self.buckets.clone())
        }

        fn lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>> {
            if query.identity == "missing" {
                return Ok(Vec::new());
            }
            Ok(vec![Hit {
                raw_data: json!({
                    "title": query.identity,
                    "info": { "uuid": query.identity, "category": ["transport"] }
                }),
                resource_name: Some("dataset".to_string()),
            }])
        }
    }

    fn bucket(key: &str) -> Bucket {
        Bucket {
            key: key.to_string(),
            score: 1.0,
            doc_count: 1,
        }
    }

    #[test]
    fn missing_records_shrink_the_page() -> Result<()> {
        let backend = Fixed {
            buckets: vec![bucket("a"), bucket("missing"), bucket("b")],
            fail_aggregate: false,
        };
        let fields = FieldKinds::default();
        let labels = Labels::default();
        let config = SearchConfig::default();
        let searcher = Searcher::new(&backend, &fields, &labels, &config);

        let params = SearchParameters {
            window: Window { from: 0, to: 9 },
            ..Default::default()
        };
        let outcome = searcher.search(&params)?;
        assert_eq!(outcome.response.metadata.len(), 2);
        assert_eq!(outcome.response.summary.count(), 2);
        assert_eq!(outcome.response.to, 1);
        assert_eq!(outcome.stats.missing, 1);
        assert_eq!(outcome.stats.windowed, 3);
        Ok(())
    }

    #[test]
    fn backend_failure_aborts_the_request() {
        let backend = Fixed {
            buckets: Vec::new(),
            fail_aggregate: true,
        };
        let fields = FieldKinds::default();
        let labels = Labels::default();
        let config = SearchConfig::default();
        let err = Searcher::new(&backend, &fields, &labels, &config)
            .search(&SearchParameters::default())
            .unwrap_err();
        assert!(matches!(err, Error::Backend { .. }));
    }

    #[test]
    fn fast_requests_project_info() -> Result<()> {
        let backend = Fixed {
            buckets: vec![bucket("a")],
            fail_aggregate: false,
        };
        let fields = FieldKinds::default();
        let labels = Labels::default();
        let config = SearchConfig::default();
        let params = SearchParameters {
            fast: true,
            ..Default::default()
        };
        let outcome = Searcher::new(&backend, &fields, &labels, &config).search(&params)?;
        assert_eq!(
            outcome.response.metadata,
            vec![json!({ "info": { "uuid": "a", "category": ["transport"] } })]
        );
        assert_eq!(outcome.response.summary.entry_count(crate::summary::Facet::Categories, "transport"), Some(1));
        Ok(())
    }
}
