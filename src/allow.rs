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

//! Allow-lists restricting which identities a search may return.

use std::collections::HashSet;
use std::path::Path;

use quick_xml::Reader as XmlReader;
use quick_xml::events::Event;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

const CATALOG_QUERY_PATH: &str = "/catalogue/srv/fre/q";
const UUID_PATH: [&[u8]; 4] = [b"response", b"metadata", b"info", b"uuid"];

pub trait AllowList {
    fn is_allowed(&self, identity: &str) -> bool;

    /// An empty list places no restriction at all.
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowSet {
    identities: HashSet<String>,
}

impl AllowSet {
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn extend_from(&mut self, other: AllowSet) {
        self.identities.extend(other.identities);
    }
}

impl<S: Into<String>> FromIterator<S> for AllowSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            identities: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl AllowList for AllowSet {
    fn is_allowed(&self, identity: &str) -> bool {
        self.identities.contains(identity)
    }

    fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowListConfig {
    pub file: Option<std::path::PathBuf>,
    pub catalog_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl AllowListConfig {
    pub fn is_configured(&self) -> bool {
        self.file.is_some() || self.catalog_url.is_some()
    }

    fn credentials(&self) -> Result<Option<(&str, &str)>> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Ok(Some((user, password)))
            }
            (None | Some(""), None | Some("")) => Ok(None),
            _ => Err(Error::Config {
                message: "allow_list.user and allow_list.password must be set together".to_string(),
            }),
        }
    }

    pub fn load(&self, base_dir: &Path) -> Result<AllowSet> {
        let mut set = AllowSet::default();
        if let Some(file) = &self.file {
            let path = if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            };
            set.extend_from(load_file(&path)?);
        }
        if let Some(uri) = &self.catalog_url {
            set.extend_from(fetch_catalog(uri, self.credentials()?)?);
        }
        tracing::info!(identities = set.len(), "allow-list loaded");
        Ok(set)
    }
}

/// One identity per line; blank lines and `#` comments are skipped.
pub fn load_file(path: &Path) -> Result<AllowSet> {
    let text = std::fs::read_to_string(path).map_err(|err| Error::AllowList {
        message: format!("read {}: {err}", path.display()),
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

/// Query endpoint of the catalog behind `source_uri`. Credentials embedded
/// in the authority are dropped.
pub fn catalog_query_url(source_uri: &str) -> Result<String> {
    let parsed = url::Url::parse(source_uri).map_err(|err| Error::AllowList {
        message: format!("invalid catalog url {source_uri:?}: {err}"),
    })?;
    let host = parsed.host_str().ok_or_else(|| Error::AllowList {
        message: format!("catalog url {source_uri:?} has no host"),
    })?;
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok(format!(
        "{}://{authority}{CATALOG_QUERY_PATH}",
        parsed.scheme()
    ))
}

pub fn fetch_catalog(source_uri: &str, credentials: Option<(&str, &str)>) -> Result<AllowSet> {
    let url = catalog_query_url(source_uri)?;
    let client = reqwest::blocking::Client::new();
    let mut request = client.get(&url);
    if let Some((user, password)) = credentials {
        request = request.basic_auth(user, Some(password));
    }
    let response = request.send().map_err(|err| Error::AllowList {
        message: format!("GET {url}: {err}"),
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::AllowList {
            message: format!("GET {url}: status {status}"),
        });
    }
    let body = response.text().map_err(|err| Error::AllowList {
        message: format!("read body from {url}: {err}"),
    })?;
    parse_catalog_response(&body)
}

pub fn parse_catalog_response(xml: &str) -> Result<AllowSet> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut identities = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => path.push(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(ref t)) if path.len() >= UUID_PATH.len() && ends_with_uuid(&path) => {
                let text = t.unescape().map_err(|err| Error::AllowList {
                    message: format!("catalog response: {err}"),
                })?;
                let text = text.trim();
                if !text.is_empty() {
                    identities.push(text.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(Error::AllowList {
                    message: format!(
                        "catalog response at byte {}: {err}",
                        reader.buffer_position()
                    ),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(identities.into_iter().collect())
}

fn ends_with_uuid(path: &[Vec<u8>]) -> bool {
    let tail = &path[path.len() - UUID_PATH.len()..];
    tail.iter()
        .zip(UUID_PATH.iter())
        .all(|(seen, expected)| seen.as_slice() == *expected)
}
