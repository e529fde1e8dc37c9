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

//! Search-result aggregation over a catalog index.

pub mod allow;
pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod labels;
pub mod model;
pub mod params;
pub mod query;
pub mod resolve;
pub mod response;
pub mod schema;
pub mod search;
pub mod store;
pub mod summary;

pub use error::Error;
pub use error::Result;
