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

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::params::Window;
use crate::summary::SummaryTally;

/// How `@to` is echoed back. The two differ once records go missing
/// between the aggregation and the lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoTo {
    #[default]
    Folded,
    Requested,
}

impl EchoTo {
    pub fn resolve(self, window: Window, count: u64) -> i64 {
        match self {
            EchoTo::Folded => window.from as i64 + count as i64 - 1,
            EchoTo::Requested => window.to as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    #[serde(rename = "@from")]
    pub from: i64,
    #[serde(rename = "@to")]
    pub to: i64,
    pub metadata: Vec<Value>,
    pub summary: SummaryTally,
}

impl SearchResponse {
    pub fn assemble(window: Window, echo: EchoTo, metadata: Vec<Value>, summary: SummaryTally) -> Self {
        Self {
            from: window.from as i64,
            to: echo.resolve(window, summary.count()),
            metadata,
            summary,
        }
    }

    pub fn to_payload(&self) -> Value {
        serde_json::json!({ "response": self })
    }
}
