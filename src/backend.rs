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

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::query::LookupQuery;
use crate::query::SearchQuery;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    /// Average relevance of the records sharing `key`.
    pub score: f64,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub raw_data: Value,
    pub resource_name: Option<String>,
}

pub trait SearchBackend {
    /// Buckets in descending relevance order.
    fn aggregate(&self, query: &SearchQuery) -> Result<Vec<Bucket>>;

    fn lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>>;
}

impl<B: SearchBackend + ?Sized> SearchBackend for &B {
    fn aggregate(&self, query: &SearchQuery) -> Result<Vec<Bucket>> {
        (**self).aggregate(query)
    }

    fn lookup(&self, query: &LookupQuery) -> Result<Vec<Hit>> {
        (**self).lookup(query)
    }
}
