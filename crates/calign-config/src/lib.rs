//! calign-config
//!
//! Layered YAML configuration with a canonical hash.
//!
//! Documents are merged in order (later overrides earlier), converted to
//! JSON, serialised with sorted object keys and hashed with SHA-256. Two runs
//! with the same effective settings therefore carry the same `config_hash`,
//! whatever order the keys were written in.
//!
//! Typed access goes through [`LoadedConfig::alignment`]. Keys nothing reads
//! are surfaced by [`report_unused_keys`].

mod alignment;
mod unused;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use alignment::{AlignmentConfig, ReportConfig, CONSUMED_POINTERS};
pub use unused::{report_unused_keys, UnusedKeyPolicy, UnusedKeyReport};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed alignment settings; absent keys take their defaults.
    pub fn alignment(&self) -> Result<AlignmentConfig> {
        AlignmentConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null and contributes nothing.
        if !v_json.is_null() {
            merged = deep_merge(merged, v_json);
        }
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON with object keys in sorted order (`serde_json::Map` is a
/// `BTreeMap` without the `preserve_order` feature).
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layer_overrides_nested_key_only() {
        let base = "strictness: warn\nreport:\n  max_listed: 10\n";
        let over = "report:\n  max_listed: 3\n";
        let loaded = load_layered_yaml_from_strings(&[base, over]).unwrap();
        assert_eq!(loaded.config_json.pointer("/report/max_listed"), Some(&3.into()));
        assert_eq!(loaded.config_json.pointer("/strictness"), Some(&"warn".into()));
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let loaded = load_layered_yaml_from_strings(&["b: 1\na: 2\n"]).unwrap();
        assert_eq!(loaded.canonical_json, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn empty_layer_is_ignored() {
        let a = load_layered_yaml_from_strings(&["a: 1\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["a: 1\n", ""]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn invalid_yaml_names_layer() {
        let err = load_layered_yaml_from_strings(&["a: 1\n", "a: [\n"]).unwrap_err();
        assert!(err.to_string().contains("layer 1"));
    }

    #[test]
    fn missing_file_errors_with_path() {
        let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }
}
