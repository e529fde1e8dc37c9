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

use std::collections::HashSet;

use crate::allow::AllowList;
use crate::backend::Bucket;
use crate::params::Window;

const IDENTITY_PARAM: &str = "ID";

/// When `ID` repeats, the last non-empty occurrence wins.
pub fn extract_identity(key: &str) -> String {
    let Some((_, rest)) = key.split_once('?') else {
        return key.to_string();
    };
    let query = rest.split_once('#').map_or(rest, |(query, _)| query);
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, value)| name == IDENTITY_PARAM && !value.is_empty())
        .last()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| key.to_string())
}

pub fn resolve_candidates(buckets: &[Bucket], allow: Option<&dyn AllowList>) -> Vec<String> {
    let allow = allow.filter(|list| !list.is_empty());
    let mut seen = HashSet::with_capacity(buckets.len());
    let mut identities = Vec::new();
    for bucket in buckets {
        let identity = extract_identity(&bucket.key);
        if seen.contains(&identity) {
            continue;
        }
        seen.insert(identity.clone());
        if let Some(list) = allow
            && !list.is_allowed(&identity)
        {
            continue;
        }
        identities.push(identity);
    }
    identities
}

pub fn select_window(identities: &[String], window: Window) -> &[String] {
    if window.from >= identities.len() {
        return &[];
    }
    let end = window.to.saturating_add(1).min(identities.len());
    &identities[window.from..end]
}
