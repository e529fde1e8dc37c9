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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(
    name = "metasearch",
    version,
    about = "Faceted metadata search over a catalog index"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new store
    Init {
        /// Path to the store directory
        path: Option<PathBuf>,
    },

    /// Add catalog records to the store
    Add(AddArgs),

    /// Remove records by uuid
    Rm(RmArgs),

    /// Search and summarize
    Search(SearchArgs),

    /// Show stats
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Run integrity checks
    Doctor {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Compact the database
    Compact {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Files or directories to add
    pub paths: Vec<PathBuf>,

    /// Glob to include
    #[arg(long)]
    pub glob: Option<String>,

    /// Ignore globs
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(long)]
    pub any: Option<String>,

    /// Resource type
    #[arg(long = "type")]
    pub resource_type: Option<String>,

    /// Topic category
    #[arg(long)]
    pub category: Option<String>,

    /// Access and use condition
    #[arg(long)]
    pub access: Option<String>,

    /// Publishing organisation
    #[arg(long)]
    pub orgname: Option<String>,

    /// Update frequency
    #[arg(long)]
    pub updatefrequency: Option<String>,

    /// Return the reduced info projection
    #[arg(long)]
    pub fast: bool,

    /// First window position
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<String>,

    /// Last window position, inclusive
    #[arg(long, allow_hyphen_values = true)]
    pub to: Option<String>,

    /// Raw request parameter as key=value
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Include the backend query
    #[arg(long)]
    pub explain: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Record uuids to remove
    pub uuids: Vec<String>,

    /// Force compaction after removal
    #[arg(long)]
    pub purge: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
