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

use std::cell::RefCell;
use std::collections::HashMap;

use metasearch::Error;
use metasearch::Result;
use metasearch::allow::AllowSet;
use metasearch::backend::Bucket;
use metasearch::backend::Hit;
use metasearch::backend::SearchBackend;
use metasearch::config::SearchConfig;
use metasearch::labels::Labels;
use metasearch::params::SearchParameters;
use metasearch::params::Window;
use metasearch::query::LookupQuery;
use metasearch::query::SearchQuery;
use metasearch::schema::FieldKinds;
use metasearch::search::Searcher;
use metasearch::summary::Facet;
use serde_json::Value;
use serde_json::json;

/// In-memory backend recording every lookup it serves.
#[derive(Default)]
struct Recording {
    buckets: Vec<Bucket>,
    records: HashMap<String, Vec<Hit>>,
    lookups: RefCell<Vec<String>>,
    aggregations: RefCell<Vec<SearchQuery>>,
}

impl Recording {
    fn with_buckets(keys: &[&str]) -> Self {
        Self {
            buckets: keys
                .iter()
                .enumerate()
                .map(|(idx, key)| Bucket {
                    key: key.to_string(),
                    score: 10.0 - idx as f64,
                    doc_count: 1,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn record(mut self, identity: &str, raw_data: Value) -> Self {
        self.records.entry(identity.to_string()).or_default().push(Hit {
            raw_data,
            resource_name: Some("dataset".to_string()),
        });
        self
    }
}

impl SearchBackend for Recording {
    fn aggregate(&self, query: &SearchQuery) -> Result<Vec<Bucket>> {
        self.aggregations.borrow_mut().push(query.clone());
        Ok(self.buckets.clone())
    }

    fn lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>> {
        self.lookups.borrow_mut().push(query.identity.clone());
        Ok(self.records.get(&query.identity).cloned().unwrap_or_default())
    }
}

fn params_from(pairs: &[(&str, &str)]) -> SearchParameters {
    SearchParameters::from_pairs(pairs.iter().copied(), Window::DEFAULT)
}

fn record(identity: &str, keywords: &[&str]) -> Value {
    json!({
        "title": format!("record {identity}"),
        "keyword": keywords,
        "info": { "uuid": identity, "createDate": "2019-04-02T10:00:00" }
    })
}

#[test]
fn duplicate_buckets_are_fetched_once_in_order() -> Result<()> {
    let backend = Recording::with_buckets(&["http://x/?ID=A", "http://x/?ID=B", "http://x/?ID=A"])
        .record("A", record("A", &[]))
        .record("B", record("B", &[]));
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();

    let params = params_from(&[("from", "0"), ("to", "1")]);
    let outcome = Searcher::new(&backend, &fields, &labels, &config).search(&params)?;

    assert_eq!(backend.lookups.borrow().as_slice(), ["A", "B"]);
    assert_eq!(backend.aggregations.borrow().len(), 1);
    let uuids: Vec<&str> = outcome
        .response
        .metadata
        .iter()
        .filter_map(|m| m["info"]["uuid"].as_str())
        .collect();
    assert_eq!(uuids, vec!["A", "B"]);
    assert_eq!(outcome.response.from, 0);
    assert_eq!(outcome.response.to, 1);
    Ok(())
}

#[test]
fn unparsable_from_falls_back_to_default() -> Result<()> {
    let keys: Vec<String> = (0..8).map(|i| format!("id-{i}")).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let mut backend = Recording::with_buckets(&key_refs);
    for key in &keys {
        backend = backend.record(key, record(key, &[]));
    }
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();

    let params = params_from(&[("from", "abc"), ("to", "5")]);
    assert_eq!(params.window, Window { from: 0, to: 5 });
    let outcome = Searcher::new(&backend, &fields, &labels, &config).search(&params)?;
    assert_eq!(outcome.response.metadata.len(), 6);
    assert_eq!(backend.lookups.borrow().len(), 6);
    Ok(())
}

#[test]
fn summary_counts_equal_returned_records() -> Result<()> {
    let backend = Recording::with_buckets(&["A", "gone", "B", "C"])
        .record("A", record("A", &["Hydrographie"]))
        .record("B", record("B", &["Hydrographie", "Hydrographie"]))
        .record("C", record("C", &["eau"]));
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();

    let outcome = Searcher::new(&backend, &fields, &labels, &config).search(&params_from(&[]))?;
    let summary = &outcome.response.summary;
    assert_eq!(summary.count(), outcome.response.metadata.len() as u64);
    assert_eq!(summary.count(), 3);
    assert_eq!(summary.entry_count(Facet::Keywords, "Hydrographie"), Some(2));
    assert_eq!(summary.entry_count(Facet::InspireThemes, "Hydrographie"), Some(2));
    assert_eq!(
        summary.entry_count(Facet::InspireThemesWithAc, "hy|Hydrographie"),
        Some(2)
    );
    assert_eq!(summary.entry_count(Facet::CreateDateYears, "2019"), Some(3));
    assert_eq!(outcome.response.to, 2);
    assert_eq!(outcome.stats.missing, 1);
    Ok(())
}

#[test]
fn allow_list_filters_without_reordering() -> Result<()> {
    let backend = Recording::with_buckets(&["C", "A", "B"])
        .record("A", record("A", &[]))
        .record("B", record("B", &[]))
        .record("C", record("C", &[]));
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();
    let allow = AllowSet::from_iter(["B", "C"]);

    Searcher::new(&backend, &fields, &labels, &config)
        .with_allow_list(&allow)
        .search(&params_from(&[]))?;
    assert_eq!(backend.lookups.borrow().as_slice(), ["C", "B"]);

    backend.lookups.borrow_mut().clear();
    let empty = AllowSet::default();
    Searcher::new(&backend, &fields, &labels, &config)
        .with_allow_list(&empty)
        .search(&params_from(&[]))?;
    assert_eq!(backend.lookups.borrow().as_slice(), ["C", "A", "B"]);
    Ok(())
}

#[test]
fn malformed_create_date_fails_the_request() {
    let backend = Recording::with_buckets(&["A"]).record(
        "A",
        json!({ "info": { "uuid": "A", "createDate": "02/04/2019" } }),
    );
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();

    let err = Searcher::new(&backend, &fields, &labels, &config)
        .search(&params_from(&[]))
        .unwrap_err();
    assert!(matches!(err, Error::MalformedCreateDate { .. }));
}

#[test]
fn filters_reach_the_backend_query() -> Result<()> {
    let backend = Recording::default();
    let fields = FieldKinds::default();
    let labels = Labels::default();
    let config = SearchConfig::default();

    let params = params_from(&[("category", "transport"), ("any", "routes")]);
    let outcome = Searcher::new(&backend, &fields, &labels, &config).search(&params)?;
    let fields: Vec<&str> = outcome
        .query
        .filters
        .iter()
        .map(|f| f.field.as_str())
        .collect();
    assert_eq!(
        fields,
        vec!["properties.category", "properties.category.keyword"]
    );
    assert!(outcome.response.metadata.is_empty());
    assert_eq!(outcome.response.to, -1);
    Ok(())
}
