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
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::allow::AllowListConfig;
use crate::labels::LabelOverrides;
use crate::params::Window;
use crate::query::DEFAULT_FUZZINESS;
use crate::query::FilterParam;
use crate::query::QueryOptions;
use crate::response::EchoTo;
use crate::schema::FieldKinds;
use crate::summary::Facet;

pub const CONFIG_FILE: &str = "metasearch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub log_level: String,
    pub search: SearchConfig,
    pub fields: FieldKinds,
    pub allow_list: AllowListConfig,
    pub labels: LabelOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("metasearch.db"),
            log_level: "warn".to_string(),
            search: SearchConfig::default(),
            fields: FieldKinds::default(),
            allow_list: AllowListConfig::default(),
            labels: LabelOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_from: usize,
    pub default_to: usize,
    pub fuzziness: f32,
    pub echo_to: EchoTo,
    pub filters: BTreeSet<FilterParam>,
    pub facets: BTreeSet<Facet>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_from: Window::DEFAULT.from,
            default_to: Window::DEFAULT.to,
            fuzziness: DEFAULT_FUZZINESS,
            echo_to: EchoTo::default(),
            filters: FilterParam::ALL.into_iter().collect(),
            facets: Facet::defaults(),
        }
    }
}

impl SearchConfig {
    pub fn default_window(&self) -> Window {
        Window {
            from: self.default_from,
            to: self.default_to,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            fuzziness: self.fuzziness,
            filters: self.filters.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd)
    }

    pub fn load_from(start: &Path) -> Result<Self> {
        let config = load_global_config()?;
        let root = find_store_root(start, &config.store_path)
            .ok_or_else(|| anyhow::anyhow!("store not found; run `metasearch init` first"))?;
        Ok(Self { root, config })
    }

    pub fn store_path(&self) -> PathBuf {
        if self.config.store_path.is_absolute() {
            self.config.store_path.clone()
        } else {
            self.root.join(&self.config.store_path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("metasearch").join(CONFIG_FILE))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn find_store_root(start: &Path, store_path: &Path) -> Option<PathBuf> {
    if store_path.is_absolute() {
        return store_path
            .exists()
            .then(|| store_path.parent().unwrap_or(store_path).to_path_buf());
    }

    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = cur.join(store_path);
        if candidate.exists() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse metasearch.toml")?;
    if config.search.default_from > config.search.default_to {
        config.search.default_from = Window::DEFAULT.from;
        config.search.default_to = Window::DEFAULT.to;
    }
    config.search.fuzziness = config.search.fuzziness.clamp(0.0, 1.0);
    Ok(config)
}
