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

//! Shared domain types used across fetching, summarizing, and assembly.

use serde_json::Value;

use crate::backend::Hit;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub identity: String,
    pub raw_data: Value,
    pub resource_name: Option<String>,
}

impl Document {
    pub fn from_hit(identity: &str, hit: Hit) -> Self {
        Self {
            identity: identity.to_string(),
            raw_data: hit.raw_data,
            resource_name: hit.resource_name,
        }
    }

    pub fn info(&self) -> Option<&serde_json::Map<String, Value>> {
        self.raw_data.get("info").and_then(Value::as_object)
    }

    /// A top-level field, treating `null` as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw_data.get(name).filter(|v| !v.is_null())
    }
}
