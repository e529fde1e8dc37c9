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

//! Display labels attached to summary entries.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

pub const RESOURCE_TYPES: &[(&str, &str)] = &[
    ("dataset", "Série de données"),
    ("nonGeographicDataset", "Jeux de données non géographiques"),
    ("series", "Ensemble de séries de données"),
    ("service", "Service"),
];

pub const CATEGORIES: &[(&str, &str)] = &[
    ("accessibilite", "Accessibilité"),
    ("citoyennete", "Citoyenneté"),
    ("culture", "Culture"),
    ("environnement", "Environnement"),
    ("equipements", "Équipements"),
    ("imagerie", "Imagerie"),
    ("limitesadministratives", "Limites administratives"),
    ("localisation", "Localisation"),
    ("occupationdusol", "Occupation du sol"),
    ("services", "Services"),
    ("transport", "Transport"),
    ("urbanisme", "Urbanisme"),
];

pub const INSPIRE_THEMES: &[(&str, &str)] = &[
    ("ac", "Conditions atmosphériques"),
    (
        "ad",
        "Zones de gestion, de restriction ou de réglementation et unités de déclaration",
    ),
    ("am", "Adresses"),
    ("au", "Unités administratives"),
    ("bu", "Bâtiments"),
    ("cp", "Parcelles cadastrales"),
    ("ef", "Installations de suivi environnemental"),
    ("el", "Altitude"),
    ("gg", "Systèmes de maillage géographique"),
    ("hb", "Habitats et biotopes"),
    ("hh", "Santé et sécurité des personnes"),
    ("hy", "Hydrographie"),
    ("lc", "Occupation des terres"),
    ("lu", "Usage des sols"),
    ("mf", "Caractéristiques géographiques météorologiques"),
    ("oi", "Ortho-imagerie"),
    ("ps", "Sites protégés"),
    ("so", "Sols"),
    ("tn", "Réseaux de transport"),
    ("us", "Services d'utilité publique et services publics"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelOverrides {
    pub categories: BTreeMap<String, String>,
    pub types: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Labels {
    categories: BTreeMap<String, String>,
    types: BTreeMap<String, String>,
    theme_codes: BTreeMap<String, String>,
}

impl Labels {
    pub fn with_overrides(overrides: &LabelOverrides) -> Self {
        let mut labels = Self::default();
        labels.categories.extend(overrides.categories.clone());
        labels.types.extend(overrides.types.clone());
        labels
    }

    pub fn category(&self, value: &str) -> String {
        self.categories
            .get(value)
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    pub fn resource_type(&self, value: &str) -> String {
        self.types
            .get(value)
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    pub fn inspire_code(&self, label: &str) -> Option<&str> {
        self.theme_codes.get(label).map(String::as_str)
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            categories: to_map(CATEGORIES),
            types: to_map(RESOURCE_TYPES),
            theme_codes: INSPIRE_THEMES
                .iter()
                .map(|(code, label)| (label.to_string(), code.to_string()))
                .collect(),
        }
    }
}

fn to_map(table: &[(&str, &str)]) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_values_fall_back_to_raw() {
        let labels = Labels::default();
        assert_eq!(labels.category("transport"), "Transport");
        assert_eq!(labels.category("sport"), "sport");
        assert_eq!(labels.resource_type("series"), "Ensemble de séries de données");
        assert_eq!(labels.inspire_code("Hydrographie"), Some("hy"));
        assert_eq!(labels.inspire_code("hydrographie"), None);
    }

    #[test]
    fn overrides_win_over_static_tables() {
        let mut overrides = LabelOverrides::default();
        overrides
            .categories
            .insert("culture".into(), "Culture & patrimoine".into());
        overrides.types.insert("map".into(), "Carte".into());
        let labels = Labels::with_overrides(&overrides);
        assert_eq!(labels.category("culture"), "Culture & patrimoine");
        assert_eq!(labels.resource_type("map"), "Carte");
        assert_eq!(labels.category("urbanisme"), "Urbanisme");
    }
}
