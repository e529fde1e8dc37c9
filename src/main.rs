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

mod cli;
mod output;

use std::path::PathBuf;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use metasearch::allow::AllowSet;
use metasearch::config;
use metasearch::config::ConfigCtx;
use metasearch::ingest;
use metasearch::labels::Labels;
use metasearch::params;
use metasearch::params::SearchParameters;
use metasearch::params::Window;
use metasearch::query::LookupQuery;
use metasearch::search::Searcher;
use metasearch::store::Store;
use metasearch::store::StoreMode;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::SearchArgs;
use crate::output::JsonResponse;
use crate::output::QueryOut;
use crate::output::StatsOut;
use crate::output::print_json;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let fallback = config::load_global_config()
        .map(|config| config.log_level)
        .unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Add(args) => handle_result(
            cmd_add(args.paths, args.glob, args.ignore, args.json),
            args.json,
        ),
        Commands::Search(args) => {
            let json = args.json;
            handle_result(cmd_search(args), json)
        }
        Commands::Rm(args) => handle_result(cmd_rm(args.uuids, args.purge, args.json), args.json),
        Commands::Stats { json } => handle_result(cmd_stats(json), json),
        Commands::Doctor { json } => handle_result(cmd_doctor(json), json),
        Commands::Compact { json } => handle_result(cmd_compact(json), json),
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let code = err
                    .downcast_ref::<metasearch::Error>()
                    .map_or("error", metasearch::Error::code);
                let resp = JsonResponse::error(code, &format!("{err:#}"));
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&root).with_context(|| format!("create dir {root:?}"))?;

    let config = config::load_global_config()?;
    let store_path = if config.store_path.is_absolute() {
        config.store_path.clone()
    } else {
        root.join(&config.store_path)
    };
    Store::init(&store_path)?;

    println!("Initialized metasearch store at {}", store_path.display());
    Ok(())
}

fn cmd_add(paths: Vec<PathBuf>, glob: Option<String>, ignore: Vec<String>, json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadWrite)?;

    let opts = ingest::IngestOptions { glob, ignore };
    let report = ingest::ingest_paths(&store, paths, &opts)?;

    if json {
        let resp = JsonResponse::ok()
            .with_stats(StatsOut::hits(report.records_added))
            .with_warnings(report.warnings);
        print_json(&resp)?;
    } else {
        println!(
            "Added {} records from {} files",
            report.records_added, report.files_read
        );
        for warn in report.warnings {
            eprintln!("warning: {warn}");
        }
    }

    Ok(())
}

fn cmd_rm(uuids: Vec<String>, purge: bool, json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadWrite)?;
    let mut removed = 0usize;
    for uuid in &uuids {
        removed += store.remove_by_uuid(uuid)?;
    }

    if purge {
        store.compact()?;
    }

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut::hits(removed));
        print_json(&resp)?;
    } else {
        println!("Removed {removed} records (tombstoned)");
    }
    Ok(())
}

fn search_parameters(args: &SearchArgs, defaults: Window) -> Result<SearchParameters> {
    let mut pairs: Vec<(&str, &str)> = [
        (params::PARAM_ANY, &args.any),
        (params::PARAM_TYPE, &args.resource_type),
        (params::PARAM_CATEGORY, &args.category),
        (params::PARAM_ACCESS, &args.access),
        (params::PARAM_ORGNAME, &args.orgname),
        (params::PARAM_UPDATE_FREQUENCY, &args.updatefrequency),
        (params::PARAM_FROM, &args.from),
        (params::PARAM_TO, &args.to),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    .collect();
    if args.fast {
        pairs.push((params::PARAM_FAST, "true"));
    }
    for raw in &args.params {
        let (key, value) = raw
            .split_once('=')
            .with_context(|| format!("invalid --param {raw:?}; expected key=value"))?;
        pairs.push((key.trim(), value));
    }
    Ok(SearchParameters::from_pairs(pairs, defaults))
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let params = search_parameters(&args, ctx.config.search.default_window())?;

    let allow: Option<AllowSet> = if ctx.config.allow_list.is_configured() {
        Some(
            ctx.config
                .allow_list
                .load(&ctx.root)
                .context("load allow-list")?,
        )
    } else {
        None
    };
    let labels = Labels::with_overrides(&ctx.config.labels);
    let mut searcher = Searcher::new(&store, &ctx.config.fields, &labels, &ctx.config.search);
    if let Some(allow) = &allow {
        searcher = searcher.with_allow_list(allow);
    }

    let outcome = searcher.search(&params)?;

    if args.json {
        let mut resp = JsonResponse::ok()
            .with_query(QueryOut::from_params(&params))
            .with_response(serde_json::to_value(&outcome.response)?);
        if args.explain {
            resp = resp.with_explain(json!({
                "aggregation": outcome.query.to_dsl(),
                "lookup": LookupQuery::for_identity("{identity}").to_dsl(),
                "window": params.window,
            }));
        }
        resp = resp.with_stats(StatsOut::search(outcome.stats));
        print_json(&resp)?;
    } else {
        let text = serde_json::to_string_pretty(&outcome.response.to_payload())?;
        println!("{text}");
    }

    Ok(())
}

fn cmd_stats(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let stats = store.stats()?;

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut::store(&stats));
        print_json(&resp)?;
    } else {
        println!("Records: {}", stats.record_count);
        println!("Identities: {}", stats.identity_count);
        println!("Duplicate identities: {}", stats.duplicate_identities);
        println!("DB size: {} bytes", stats.db_size_bytes);
    }

    Ok(())
}

fn cmd_doctor(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let report = store.integrity_check()?;

    if json {
        let resp = JsonResponse::ok()
            .with_stats(StatsOut::store(&report.stats))
            .with_diagnostics(json!({
                "integrity": report.status,
                "duplicate_identities": report.stats.duplicate_identities,
            }));
        print_json(&resp)?;
    } else {
        println!("Integrity: {}", report.status);
        if report.stats.duplicate_identities > 0 {
            println!(
                "Duplicate identities: {} (searches keep the first record)",
                report.stats.duplicate_identities
            );
        }
    }

    Ok(())
}

fn cmd_compact(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadWrite)?;
    store.compact()?;

    if json {
        let resp = JsonResponse::ok();
        print_json(&resp)?;
    } else {
        println!("Compaction complete");
    }

    Ok(())
}
