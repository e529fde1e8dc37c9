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

//! Caller-facing search parameters, as parsed from the transport layer.

use serde::Serialize;

pub const PARAM_ANY: &str = "any";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_CATEGORY: &str = "category";
pub const PARAM_ACCESS: &str = "conditionapplyingtoaccessanduse";
pub const PARAM_ORGNAME: &str = "orgname";
pub const PARAM_UPDATE_FREQUENCY: &str = "updatefrequency";
pub const PARAM_FAST: &str = "fast";
pub const PARAM_FROM: &str = "from";
pub const PARAM_TO: &str = "to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub from: usize,
    pub to: usize,
}

impl Window {
    pub const DEFAULT: Window = Window { from: 0, to: 9 };

    /// Parses raw bounds, keeping `defaults` for anything unparsable and
    /// resetting both bounds when they end up inverted. Negative bounds are
    /// compared as given and only clamped to zero afterwards.
    pub fn parse(from: Option<&str>, to: Option<&str>, defaults: Window) -> Self {
        let from_val = from.and_then(parse_bound).unwrap_or(defaults.from as i64);
        let to_val = to.and_then(parse_bound).unwrap_or(defaults.to as i64);
        if from_val > to_val {
            return defaults;
        }
        Self {
            from: from_val.max(0) as usize,
            to: to_val.max(0) as usize,
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn parse_bound(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchParameters {
    pub any: Option<String>,
    pub resource_type: Option<String>,
    pub category: Option<String>,
    pub access_condition: Option<String>,
    pub org_name: Option<String>,
    pub update_frequency: Option<String>,
    pub fast: bool,
    pub window: Window,
}

impl SearchParameters {
    pub fn from_pairs<'a, I>(pairs: I, defaults: Window) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = SearchParameters {
            window: defaults,
            ..Default::default()
        };
        let mut from = None;
        let mut to = None;
        for (key, value) in pairs {
            match key {
                PARAM_ANY => params.any = non_empty(value),
                PARAM_TYPE => params.resource_type = non_empty(value),
                PARAM_CATEGORY => params.category = non_empty(value),
                PARAM_ACCESS => params.access_condition = non_empty(value),
                PARAM_ORGNAME => params.org_name = non_empty(value),
                PARAM_UPDATE_FREQUENCY => params.update_frequency = non_empty(value),
                PARAM_FAST => params.fast = parse_flag(value),
                PARAM_FROM => from = Some(value),
                PARAM_TO => to = Some(value),
                _ => {}
            }
        }
        params.window = Window::parse(from, to, defaults);
        params
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
