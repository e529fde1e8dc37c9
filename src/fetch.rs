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

use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::backend::SearchBackend;
use crate::error::Result;
use crate::model::Document;
use crate::query::LookupQuery;

pub const FAST_INFO_KEYS: [&str; 8] = [
    "category",
    "changeDate",
    "createDate",
    "id",
    "schema",
    "selected",
    "source",
    "uuid",
];

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(Document),
    Missing,
}

pub fn fetch_document(backend: &dyn SearchBackend, identity: &str) -> Result<FetchOutcome> {
    let hits = backend.lookup(&LookupQuery::for_identity(identity))?;
    let total = hits.len();
    let Some(first) = hits.into_iter().next() else {
        tracing::debug!(identity, "no record behind aggregated identity; skipping");
        return Ok(FetchOutcome::Missing);
    };
    if total > 1 {
        tracing::warn!(
            identity,
            records = total,
            "duplicate identity; keeping the first record"
        );
    }
    Ok(FetchOutcome::Found(Document::from_hit(identity, first)))
}

pub fn fast_projection(raw: &Value) -> Value {
    let mut info = Map::new();
    if let Some(source) = raw.get("info").and_then(Value::as_object) {
        for key in FAST_INFO_KEYS {
            if let Some(value) = source.get(key) {
                info.insert(key.to_string(), value.clone());
            }
        }
    }
    json!({ "info": Value::Object(info) })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::backend::Bucket;
    use crate::backend::Hit;
    use crate::query::SearchQuery;

    struct Lookups {
        hits: Vec<Hit>,
        calls: RefCell<Vec<String>>,
    }

    impl SearchBackend for Lookups {
        fn aggregate(&self, _query: &SearchQuery) -> Result<Vec<Bucket>> {
            Ok(Vec::new())
        }

        fn lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>> {
            self.calls.borrow_mut().push(query.identity.clone());
            Ok(self.hits.clone())
        }
    }

    fn hit(title: &str) -> Hit {
        Hit {
            raw_data: json!({ "title": title }),
            resource_name: Some("dataset".into()),
        }
    }

    #[test]
    fn missing_record_is_not_an_error() -> Result<()> {
        let backend = Lookups {
            hits: Vec::new(),
            calls: RefCell::new(Vec::new()),
        };
        assert_eq!(fetch_document(&backend, "gone")?, FetchOutcome::Missing);
        assert_eq!(backend.calls.borrow().as_slice(), ["gone"]);
        Ok(())
    }

    #[test]
    fn duplicates_keep_first_record() -> Result<()> {
        let backend = Lookups {
            hits: vec![hit("first"), hit("second")],
            calls: RefCell::new(Vec::new()),
        };
        let FetchOutcome::Found(doc) = fetch_document(&backend, "dup")? else {
            panic!("expected a document");
        };
        assert_eq!(doc.identity, "dup");
        assert_eq!(doc.raw_data["title"], "first");
        Ok(())
    }

    #[test]
    fn fast_projection_keeps_listed_info_keys() {
        let raw = json!({
            "title": "Routes",
            "info": {
                "category": ["transport"],
                "createDate": "2020-01-01T00:00:00",
                "uuid": "u-1",
                "selected": "false",
                "ownername": "admin"
            }
        });
        assert_eq!(
            fast_projection(&raw),
            json!({ "info": {
                "category": ["transport"],
                "createDate": "2020-01-01T00:00:00",
                "selected": "false",
                "uuid": "u-1"
            } })
        );
        assert_eq!(fast_projection(&json!({})), json!({ "info": {} }));
    }
}
