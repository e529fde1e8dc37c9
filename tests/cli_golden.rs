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

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use jsonschema::JSONSchema;
use predicates::prelude::*;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

fn metasearch_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("metasearch"))
}

fn metasearch_cmd_with_env(config_root: &Path) -> Command {
    let mut cmd = metasearch_cmd();
    cmd.env("XDG_CONFIG_HOME", config_root);
    cmd.env("HOME", config_root);
    cmd.env("APPDATA", config_root);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn global_config_path(config_root: &Path) -> PathBuf {
    let base = if cfg!(target_os = "macos") {
        config_root.join("Library").join("Application Support")
    } else {
        config_root.to_path_buf()
    };
    base.join("metasearch").join("metasearch.toml")
}

fn load_schema() -> JSONSchema {
    let schema_text = include_str!("../schemas/response.schema.json");
    let schema_json: Value = serde_json::from_str(schema_text).expect("schema json");
    JSONSchema::options()
        .compile(&schema_json)
        .expect("compile schema")
}

fn run_json(cmd: &mut Command, cwd: &Path) -> Value {
    let output = cmd.current_dir(cwd).output().expect("run command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("parse json")
}

fn assert_schema(schema: &JSONSchema, value: &Value) {
    if let Err(errors) = schema.validate(value) {
        let msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
        panic!("schema validation failed:\n{}", msgs.join("\n"));
    }
}

fn seed_records(root: &Path) {
    let records = [
        json!({
            "origin": {
                "uuid": "u-1",
                "source": { "type": "geonet" },
                "resource": { "name": "dataset", "metadata_url": "http://catalog.example/csw?ID=u-1" }
            },
            "properties": { "title": "Réseau routier", "category": ["transport"] },
            "raw_data": {
                "title": "Réseau routier",
                "keyword": ["Réseaux de transport"],
                "info": { "uuid": "u-1", "createDate": "2018-03-01T12:00:00", "category": ["transport"] }
            }
        }),
        json!({
            "origin": {
                "uuid": "u-2",
                "source": { "type": "geonet" },
                "resource": { "name": "dataset", "metadata_url": "http://catalog.example/csw?ID=u-2" }
            },
            "properties": { "title": "Cours d'eau", "category": "environnement" },
            "raw_data": {
                "title": "Cours d'eau",
                "keyword": ["Hydrographie"],
                "info": { "uuid": "u-2", "createDate": "2020-06-15T08:30:00", "category": "environnement" }
            }
        }),
        json!({
            "origin": {
                "uuid": "layer-7",
                "source": { "type": "wfs" },
                "resource": { "name": "service", "metadata_url": "http://catalog.example/csw?ID=u-1" }
            },
            "properties": { "title": "Routes" },
            "raw_data": { "title": "Routes layer" }
        }),
    ];
    let lines: Vec<String> = records.iter().map(Value::to_string).collect();
    fs::create_dir_all(root.join("records")).expect("records dir");
    fs::write(
        root.join("records/catalog.jsonl"),
        format!("{}\n{{broken\n", lines.join("\n")),
    )
    .expect("write records");
}

fn init_store(config_root: &Path, root: &Path) {
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["init", "."]);
    cmd.current_dir(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized metasearch store"));
}

fn uuids(search: &Value) -> Vec<String> {
    search["response"]["metadata"]
        .as_array()
        .expect("metadata array")
        .iter()
        .filter_map(|m| m["info"]["uuid"].as_str())
        .map(str::to_string)
        .collect()
}

#[test]
fn golden_cli_outputs() {
    let schema = load_schema();
    let config_temp = TempDir::new().expect("config tempdir");
    let config_root = config_temp.path();
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    seed_records(root);
    init_store(config_root, root);

    // add
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["add", "records", "--glob", "**/*.jsonl", "--json"]);
    let add_json = run_json(&mut cmd, root);
    assert_schema(&schema, &add_json);
    assert_eq!(add_json["stats"]["total_hits"], 3);
    let warnings = add_json["warnings"].as_array().expect("warnings");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap_or("").contains(":4:"));

    // match-all search folds the wfs bucket into its catalog record
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--json", "--explain"]);
    let search_json = run_json(&mut cmd, root);
    assert_schema(&schema, &search_json);
    assert_eq!(uuids(&search_json), vec!["u-1", "u-2"]);
    assert_eq!(search_json["response"]["@from"], 0);
    assert_eq!(search_json["response"]["@to"], 1);
    assert_eq!(search_json["stats"]["pipeline"]["buckets"], 3);
    assert_eq!(search_json["stats"]["pipeline"]["candidates"], 2);
    assert_eq!(
        search_json["explain"]["aggregation"]["aggs"]["metadata"]["terms"]["size"],
        9_999_999
    );
    let summary = &search_json["response"]["summary"];
    assert_eq!(summary["@count"], 2);
    let categories: Vec<String> = summary["categories"]["category"]
        .as_array()
        .expect("categories")
        .iter()
        .map(|entry| {
            format!(
                "{} {} {}",
                entry["@name"].as_str().unwrap_or(""),
                entry["@count"],
                entry["@label"].as_str().unwrap_or("")
            )
        })
        .collect();
    insta::assert_json_snapshot!(categories, @r#"
    [
      "transport 1 Transport",
      "environnement 1 Environnement"
    ]
    "#);
    assert_eq!(summary["inspireThemesWithAc"]["inspireThemeWithAc"][0]["@name"], "tn|Réseaux de transport");
    assert_eq!(summary["types"]["type"][0]["@label"], "Série de données");
    assert_eq!(summary["status"]["status"], json!([]));

    // facet filter
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--category", "environnement", "--json"]);
    let filtered_json = run_json(&mut cmd, root);
    assert_schema(&schema, &filtered_json);
    assert_eq!(uuids(&filtered_json), vec!["u-2"]);
    assert_eq!(filtered_json["query"]["filters"]["category"], "environnement");

    // fuzzy free text
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--any", "cours eau", "--json"]);
    let text_json = run_json(&mut cmd, root);
    assert_schema(&schema, &text_json);
    assert_eq!(uuids(&text_json), vec!["u-2"]);

    // malformed or inverted bounds fall back to the default window
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--from", "abc", "--to", "-3", "--fast", "--json"]);
    let window_json = run_json(&mut cmd, root);
    assert_schema(&schema, &window_json);
    assert_eq!(uuids(&window_json), vec!["u-1", "u-2"]);
    assert_eq!(window_json["query"]["from"], 0);
    assert_eq!(window_json["query"]["to"], 9);
    assert_eq!(
        window_json["response"]["metadata"][0],
        json!({ "info": {
            "category": ["transport"],
            "createDate": "2018-03-01T12:00:00",
            "uuid": "u-1"
        } })
    );

    // raw parameters
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--param", "from=1", "--param", "fast=off", "--json"]);
    let param_json = run_json(&mut cmd, root);
    assert_schema(&schema, &param_json);
    assert_eq!(uuids(&param_json), vec!["u-2"]);
    assert_eq!(param_json["query"]["fast"], false);

    // stats
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["stats", "--json"]);
    let stats_json = run_json(&mut cmd, root);
    assert_schema(&schema, &stats_json);
    assert_eq!(stats_json["stats"]["record_count"], 3);
    assert_eq!(stats_json["stats"]["identity_count"], 3);

    // doctor
    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["doctor", "--json"]);
    let doctor_json = run_json(&mut cmd, root);
    assert_schema(&schema, &doctor_json);
    assert_eq!(doctor_json["diagnostics"]["integrity"], "ok");
}

#[test]
fn removed_records_leave_search_results() {
    let schema = load_schema();
    let config_temp = TempDir::new().expect("config tempdir");
    let config_root = config_temp.path();
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    seed_records(root);
    init_store(config_root, root);

    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["add", "records", "--json"]);
    run_json(&mut cmd, root);

    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["rm", "u-2", "--purge", "--json"]);
    let rm_json = run_json(&mut cmd, root);
    assert_schema(&schema, &rm_json);
    assert_eq!(rm_json["stats"]["total_hits"], 1);

    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--json"]);
    let search_json = run_json(&mut cmd, root);
    assert_schema(&schema, &search_json);
    assert_eq!(uuids(&search_json), vec!["u-1"]);
    assert_eq!(search_json["response"]["summary"]["@count"], 1);
}

#[test]
fn allow_list_file_restricts_results() {
    let config_temp = TempDir::new().expect("config tempdir");
    let config_root = config_temp.path();
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    seed_records(root);
    init_store(config_root, root);

    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["add", "records"]);
    cmd.current_dir(root).assert().success();

    fs::write(root.join("allowed.txt"), "# published\nu-2\n").expect("write allow-list");
    let config_path = global_config_path(config_root);
    fs::create_dir_all(config_path.parent().expect("config parent")).expect("config dir");
    fs::write(
        &config_path,
        "[allow_list]\nfile = \"allowed.txt\"\n\n[search]\necho_to = \"requested\"\n",
    )
    .expect("write config");

    let mut cmd = metasearch_cmd_with_env(config_root);
    cmd.args(["search", "--json"]);
    let search_json = run_json(&mut cmd, root);
    assert_eq!(uuids(&search_json), vec!["u-2"]);
    assert_eq!(search_json["response"]["@to"], 9);
}

#[test]
fn json_errors_render_an_envelope() {
    let schema = load_schema();
    let config_temp = TempDir::new().expect("config tempdir");
    let temp = TempDir::new().expect("tempdir");

    let mut cmd = metasearch_cmd_with_env(config_temp.path());
    cmd.args(["search", "--json"]);
    let error_json = run_json(&mut cmd, temp.path());
    assert_schema(&schema, &error_json);
    assert_eq!(error_json["ok"], false);
    assert_eq!(error_json["error"]["code"], "error");
    assert!(
        error_json["error"]["message"]
            .as_str()
            .unwrap_or("")
            .contains("store not found")
    );

    let mut cmd = metasearch_cmd_with_env(config_temp.path());
    cmd.args(["stats"]);
    cmd.current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}
