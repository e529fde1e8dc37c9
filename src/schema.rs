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

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Keyword,
}

/// Schemas can be heterogeneous across collections, so one field may be
/// reported under both kinds at once.
pub trait FieldKindLookup {
    fn has_kind(&self, field: &str, kind: FieldKind) -> bool;

    fn text_fields(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FieldKinds {
    pub text: BTreeSet<String>,
    pub keyword: BTreeSet<String>,
}

impl FieldKinds {
    pub fn new<T, K>(text: T, keyword: K) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            text: text.into_iter().map(Into::into).collect(),
            keyword: keyword.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for FieldKinds {
    fn default() -> Self {
        Self::new(
            ["title", "abstract", "keyword", "category", "rights", "publisher"],
            ["category", "rights", "publisher", "updateFrequency"],
        )
    }
}

impl FieldKindLookup for FieldKinds {
    fn has_kind(&self, field: &str, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Text => self.text.contains(field),
            FieldKind::Keyword => self.keyword.contains(field),
        }
    }

    fn text_fields(&self) -> Vec<String> {
        self.text.iter().cloned().collect()
    }
}
