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

//! Multi-facet summary over the documents of one result page.
//!
//! Each document is folded into a [`SummaryTally`] exactly once. Within a
//! facet an entry counts the documents its name appeared in, and entries
//! keep first-seen order. Attributes such as labels are fixed when an entry
//! is first inserted.
//!
//! Document fields arrive in several shapes (a string, a list of strings, a
//! list of `{"$": text}` objects, a single object or a list of them). They
//! are normalized by [`text_values`], [`objects`] and [`legal_texts`] before
//! any facet rule looks at them.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::Map;
use serde_json::Value;
use time::PrimitiveDateTime;
use time::macros::format_description;

use crate::error::Error;
use crate::error::Result;
use crate::labels::Labels;
use crate::model::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    Categories,
    CreateDateYears,
    Denominators,
    Formats,
    InspireThemes,
    InspireThemesWithAc,
    Keywords,
    Licence,
    MaintenanceAndUpdateFrequencies,
    OrgNames,
    Resolutions,
    ServiceTypes,
    SpatialRepresentationTypes,
    Status,
    Types,
}

impl Facet {
    pub const BASE: [Facet; 10] = [
        Facet::Categories,
        Facet::CreateDateYears,
        Facet::Formats,
        Facet::InspireThemes,
        Facet::InspireThemesWithAc,
        Facet::Keywords,
        Facet::Licence,
        Facet::OrgNames,
        Facet::Status,
        Facet::Types,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Facet::Categories => "categories",
            Facet::CreateDateYears => "createDateYears",
            Facet::Denominators => "denominators",
            Facet::Formats => "formats",
            Facet::InspireThemes => "inspireThemes",
            Facet::InspireThemesWithAc => "inspireThemesWithAc",
            Facet::Keywords => "keywords",
            Facet::Licence => "licence",
            Facet::MaintenanceAndUpdateFrequencies => "maintenanceAndUpdateFrequencies",
            Facet::OrgNames => "orgNames",
            Facet::Resolutions => "resolutions",
            Facet::ServiceTypes => "serviceTypes",
            Facet::SpatialRepresentationTypes => "spatialRepresentationTypes",
            Facet::Status => "status",
            Facet::Types => "types",
        }
    }

    pub fn element(self) -> &'static str {
        match self {
            Facet::Categories => "category",
            Facet::CreateDateYears => "createDateYear",
            Facet::Denominators => "denominator",
            Facet::Formats => "format",
            Facet::InspireThemes => "inspireTheme",
            Facet::InspireThemesWithAc => "inspireThemeWithAc",
            Facet::Keywords => "keyword",
            Facet::Licence => "useLimitation",
            Facet::MaintenanceAndUpdateFrequencies => "maintenanceAndUpdateFrequency",
            Facet::OrgNames => "orgName",
            Facet::Resolutions => "resolution",
            Facet::ServiceTypes => "serviceType",
            Facet::SpatialRepresentationTypes => "spatialRepresentationType",
            Facet::Status => "status",
            Facet::Types => "type",
        }
    }

    /// Whether documents carry a source field for this facet. The others
    /// are declared for the output layout only and always stay empty.
    pub fn is_extracted(self) -> bool {
        !matches!(
            self,
            Facet::Denominators
                | Facet::MaintenanceAndUpdateFrequencies
                | Facet::Resolutions
                | Facet::ServiceTypes
                | Facet::SpatialRepresentationTypes
                | Facet::Status
        )
    }

    pub fn defaults() -> BTreeSet<Facet> {
        Facet::BASE
            .into_iter()
            .filter(|facet| facet.is_extracted())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@count")]
    pub count: u64,
    #[serde(rename = "@label", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FacetEntries {
    entries: Vec<SummaryEntry>,
    index: HashMap<String, usize>,
}

impl FacetEntries {
    fn bump(&mut self, name: String, label: Option<String>) {
        if let Some(&pos) = self.index.get(&name) {
            self.entries[pos].count += 1;
            return;
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(SummaryEntry {
            name,
            count: 1,
            label,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryTally {
    count: u64,
    facets: BTreeMap<Facet, FacetEntries>,
}

impl SummaryTally {
    pub fn new(extra: &BTreeSet<Facet>) -> Self {
        let facets = Facet::BASE
            .iter()
            .chain(extra.iter())
            .map(|facet| (*facet, FacetEntries::default()))
            .collect();
        Self { count: 0, facets }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_declared(&self, facet: Facet) -> bool {
        self.facets.contains_key(&facet)
    }

    pub fn entries(&self, facet: Facet) -> &[SummaryEntry] {
        self.facets
            .get(&facet)
            .map(|f| f.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn entry_count(&self, facet: Facet, name: &str) -> Option<u64> {
        let entries = self.facets.get(&facet)?;
        entries.index.get(name).map(|&pos| entries.entries[pos].count)
    }

    fn apply(&mut self, contributions: Contributions) {
        for (facet, name, label) in contributions.items {
            if let Some(entries) = self.facets.get_mut(&facet) {
                entries.bump(name, label);
            }
        }
        self.count += 1;
    }
}

impl Default for SummaryTally {
    fn default() -> Self {
        Self::new(&BTreeSet::new())
    }
}

impl Serialize for SummaryTally {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.facets.len() + 1))?;
        map.serialize_entry("@count", &self.count)?;
        for (facet, entries) in &self.facets {
            let mut inner = BTreeMap::new();
            inner.insert(facet.element(), &entries.entries);
            map.serialize_entry(facet.name(), &inner)?;
        }
        map.end()
    }
}

#[derive(Default)]
struct Contributions {
    items: Vec<(Facet, String, Option<String>)>,
    seen: HashSet<(Facet, String)>,
}

impl Contributions {
    fn push(&mut self, facet: Facet, name: &str, label: Option<String>) {
        if name.is_empty() || !self.seen.insert((facet, name.to_string())) {
            return;
        }
        self.items.push((facet, name.to_string(), label));
    }
}

#[derive(Debug, Clone)]
pub struct Aggregator<'a> {
    labels: &'a Labels,
    facets: &'a BTreeSet<Facet>,
}

impl<'a> Aggregator<'a> {
    pub fn new(labels: &'a Labels, facets: &'a BTreeSet<Facet>) -> Self {
        Self { labels, facets }
    }

    pub fn new_tally(&self) -> SummaryTally {
        SummaryTally::new(self.facets)
    }

    /// Folds one document. On error the tally is left untouched.
    pub fn fold(&self, tally: &mut SummaryTally, doc: &Document) -> Result<()> {
        let contributions = self.extract(doc)?;
        tally.apply(contributions);
        Ok(())
    }

    pub fn fold_all<'d, I>(&self, tally: &mut SummaryTally, docs: I) -> Result<()>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        for doc in docs {
            self.fold(tally, doc)?;
        }
        Ok(())
    }

    fn active(&self, facet: Facet) -> bool {
        facet.is_extracted() && self.facets.contains(&facet)
    }

    fn extract(&self, doc: &Document) -> Result<Contributions> {
        let mut out = Contributions::default();
        let info = doc.info();

        if self.active(Facet::Categories)
            && let Some(category) = info.and_then(|i| i.get("category"))
        {
            for value in text_values(category) {
                out.push(Facet::Categories, value, Some(self.labels.category(value)));
            }
        }

        if self.active(Facet::CreateDateYears)
            && let Some(created) = info.and_then(|i| i.get("createDate")).filter(|v| !v.is_null())
        {
            let year = creation_year(&doc.identity, created)?;
            out.push(Facet::CreateDateYears, &year, None);
        }

        if self.active(Facet::Formats)
            && let Some(format) = doc.field("format")
        {
            for value in text_values(format) {
                out.push(Facet::Formats, value, None);
            }
        }

        if let Some(keyword) = doc.field("keyword") {
            for value in text_values(keyword) {
                self.push_keyword(&mut out, value);
            }
        }

        if self.active(Facet::Licence) {
            if let Some(constraints) = doc.field("LegalConstraints") {
                for text in constraint_texts(constraints) {
                    out.push(Facet::Licence, text, None);
                }
            }
            if let Some(rights) = doc.field("rights") {
                for value in text_values(rights) {
                    out.push(Facet::Licence, value, None);
                }
            }
        }

        if self.active(Facet::OrgNames) {
            if let Some(parties) = doc.field("responsibleParty") {
                for party in objects(parties) {
                    if let Some(name) = party.get("organisationName") {
                        for value in text_values(name) {
                            out.push(Facet::OrgNames, value, None);
                        }
                    }
                }
            }
            if let Some(publisher) = doc.field("publisher") {
                for value in text_values(publisher) {
                    out.push(Facet::OrgNames, value, None);
                }
            }
        }

        if self.active(Facet::Types)
            && let Some(resource) = doc.resource_name.as_deref()
        {
            out.push(Facet::Types, resource, Some(self.labels.resource_type(resource)));
        }

        Ok(out)
    }

    fn push_keyword(&self, out: &mut Contributions, value: &str) {
        if self.active(Facet::Keywords) {
            out.push(Facet::Keywords, value, None);
        }
        let Some(code) = self.labels.inspire_code(value) else {
            return;
        };
        if self.active(Facet::InspireThemes) {
            out.push(Facet::InspireThemes, value, None);
        }
        if self.active(Facet::InspireThemesWithAc) {
            out.push(Facet::InspireThemesWithAc, &format!("{code}|{value}"), None);
        }
    }
}

fn creation_year(identity: &str, value: &Value) -> Result<String> {
    let malformed = || Error::MalformedCreateDate {
        identity: identity.to_string(),
        value: value.to_string(),
    };
    let text = value.as_str().ok_or_else(malformed)?;
    let format = format_description!(
        "[year]-[month padding:none]-[day padding:none]T[hour padding:none]:[minute padding:none]:[second padding:none]"
    );
    let parsed = PrimitiveDateTime::parse(text, &format).map_err(|_| malformed())?;
    Ok(parsed.year().to_string())
}

pub fn text_values(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(tagged_text).collect(),
        Value::Object(_) => tagged_text(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

fn tagged_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj.get("$").and_then(Value::as_str),
        _ => None,
    }
}

pub fn objects(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Object(obj) => vec![obj],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Text of a constraint value: a string, a `{"CharacterString": text}`
/// object, or a list of either.
pub fn legal_texts(value: &Value) -> Vec<&str> {
    match value {
        Value::String(s) => vec![s.as_str()],
        Value::Object(obj) => obj
            .get("CharacterString")
            .and_then(Value::as_str)
            .into_iter()
            .collect(),
        Value::Array(items) => items.iter().flat_map(legal_texts).collect(),
        _ => Vec::new(),
    }
}

// Licence entries are human-readable text; anything carrying a link is left out.
fn constraint_texts(value: &Value) -> Vec<&str> {
    let mut out = Vec::new();
    for constraint in objects(value) {
        if is_preformatted(constraint) {
            continue;
        }
        for key in ["useLimitation", "otherConstraints"] {
            let Some(field) = constraint.get(key) else {
                continue;
            };
            out.extend(legal_texts(field).into_iter().filter(|t| !t.contains("http")));
        }
    }
    out
}

fn is_preformatted(constraint: &Map<String, Value>) -> bool {
    match constraint.get("@preformatted") {
        Some(Value::String(s)) => s == "true",
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}
