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

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("backend error: {message}")]
    Backend { message: String },
    #[error("malformed createDate {value:?} on record {identity}")]
    MalformedCreateDate { identity: String, value: String },
    #[error("allow-list error: {message}")]
    AllowList { message: String },
    #[error("config error: {message}")]
    Config { message: String },
}

impl Error {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Backend { .. } => "backend",
            Self::MalformedCreateDate { .. } => "malformed_document",
            Self::AllowList { .. } => "allow_list",
            Self::Config { .. } => "config",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::backend(err)
    }
}
