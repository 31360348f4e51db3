//! Definition parser: raw `action.yml` bytes to a normalized [`Definition`].
//!
//! Parsing is a pure transform apart from surfacing the original raw bytes
//! for hashing. Tolerances are deliberate and explicit: missing optional
//! fields become empty strings, and an `inputs`/`outputs` block that is not
//! a mapping is classified as [`BlockShape::Other`] and treated as empty
//! rather than failing the entry.

use std::path::{Path, PathBuf};

use serde_yaml::Value as Yaml;
use thiserror::Error;

use crate::models::{Definition, InputSpec, OutputSpec};

/// A malformed source definition. The entry is skipped; the run continues.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{path}: definition root is not a mapping")]
    NotAMapping { path: PathBuf },
}

/// Shape of a raw `inputs`/`outputs` block, made explicit so the "treat
/// anything else as empty" tolerance is visible in code and tests.
enum BlockShape<'a> {
    Mapping(&'a serde_yaml::Mapping),
    Other,
}

fn classify(value: Option<&Yaml>) -> BlockShape<'_> {
    match value {
        Some(Yaml::Mapping(map)) => BlockShape::Mapping(map),
        _ => BlockShape::Other,
    }
}

/// Read and parse a definition file, returning the normalized record along
/// with the raw bytes for content-identity hashing.
pub fn parse_definition_file(path: &Path) -> Result<(Definition, Vec<u8>), ParseError> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let definition = parse_definition(&bytes, path)?;
    Ok((definition, bytes))
}

/// Parse raw definition bytes into a normalized record.
pub fn parse_definition(bytes: &[u8], path: &Path) -> Result<Definition, ParseError> {
    let root: Yaml = serde_yaml::from_slice(bytes).map_err(|source| ParseError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let map = match root {
        Yaml::Mapping(map) => map,
        _ => {
            return Err(ParseError::NotAMapping {
                path: path.to_path_buf(),
            })
        }
    };

    let mut inputs = Vec::new();
    if let BlockShape::Mapping(block) = classify(map.get("inputs")) {
        for (key, value) in block {
            let name = yaml_string(Some(key));
            // A non-mapping input body (e.g. `token: null`) yields defaults.
            let (required, default, description) = match value {
                Yaml::Mapping(fields) => (
                    matches!(fields.get("required"), Some(Yaml::Bool(true))),
                    fields.get("default").map(yaml_to_json),
                    yaml_string(fields.get("description")),
                ),
                _ => (false, None, String::new()),
            };
            inputs.push(InputSpec {
                name,
                required,
                default,
                description,
            });
        }
    }

    let mut outputs = Vec::new();
    if let BlockShape::Mapping(block) = classify(map.get("outputs")) {
        for (key, value) in block {
            let description = match value {
                Yaml::Mapping(fields) => yaml_string(fields.get("description")),
                _ => String::new(),
            };
            outputs.push(OutputSpec {
                name: yaml_string(Some(key)),
                description,
            });
        }
    }

    let runs = map
        .get("runs")
        .map(yaml_to_json)
        .unwrap_or_else(|| serde_json::json!({}));

    Ok(Definition {
        name: yaml_string(map.get("name")),
        description: yaml_string(map.get("description")),
        author: yaml_string(map.get("author")),
        inputs,
        outputs,
        runs,
    })
}

/// Extract a string field. Scalars keep their value ("123", "true");
/// missing or structured values become empty.
fn yaml_string(value: Option<&Yaml>) -> String {
    match value {
        Some(Yaml::String(s)) => s.clone(),
        Some(Yaml::Bool(b)) => b.to_string(),
        Some(Yaml::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Convert a YAML value to JSON for opaque pass-through storage.
/// Non-string mapping keys are stringified rather than rejected.
fn yaml_to_json(value: &Yaml) -> serde_json::Value {
    match value {
        Yaml::Null => serde_json::Value::Null,
        Yaml::Bool(b) => serde_json::Value::Bool(*b),
        Yaml::Number(n) => {
            serde_json::to_value(n).unwrap_or(serde_json::Value::Null)
        }
        Yaml::String(s) => serde_json::Value::String(s.clone()),
        Yaml::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        Yaml::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default(),
                };
                out.insert(key, yaml_to_json(v));
            }
            serde_json::Value::Object(out)
        }
        Yaml::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Definition {
        parse_definition(yaml.as_bytes(), Path::new("action.yml")).unwrap()
    }

    #[test]
    fn normalizes_required_input_and_empty_outputs() {
        let def = parse(
            "name: Setup\ninputs:\n  token:\n    required: true\noutputs: {}\n",
        );
        assert_eq!(def.inputs.len(), 1);
        assert_eq!(def.inputs[0].name, "token");
        assert!(def.inputs[0].required);
        assert_eq!(def.inputs[0].default, None);
        assert_eq!(def.inputs[0].description, "");
        assert!(def.outputs.is_empty());
    }

    #[test]
    fn missing_optional_fields_become_empty_strings() {
        let def = parse("name: Lint\nruns:\n  using: composite\n");
        assert_eq!(def.name, "Lint");
        assert_eq!(def.description, "");
        assert_eq!(def.author, "");
        assert!(def.inputs.is_empty());
        assert!(def.outputs.is_empty());
    }

    #[test]
    fn non_mapping_inputs_block_treated_as_empty() {
        let def = parse("name: X\ninputs: not-a-mapping\n");
        assert!(def.inputs.is_empty());

        let def = parse("name: X\ninputs:\n  - a\n  - b\n");
        assert!(def.inputs.is_empty());
    }

    #[test]
    fn non_mapping_input_body_yields_defaults() {
        let def = parse("inputs:\n  token: null\n");
        assert_eq!(def.inputs.len(), 1);
        assert_eq!(def.inputs[0].name, "token");
        assert!(!def.inputs[0].required);
    }

    #[test]
    fn input_order_is_preserved() {
        let def = parse(
            "inputs:\n  zulu: {}\n  alpha: {}\n  mike: {}\n",
        );
        let names: Vec<_> = def.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn runs_block_passes_through_opaquely() {
        let def = parse("runs:\n  using: node20\n  main: dist/index.js\n");
        assert_eq!(def.runs["using"], "node20");
        assert_eq!(def.runs["main"], "dist/index.js");

        let def = parse("name: X\n");
        assert_eq!(def.runs, serde_json::json!({}));
    }

    // Unknown sub-fields beyond the documented subset are silently dropped.
    // Preserved as deliberate tolerance; this test pins the behavior.
    #[test]
    fn unknown_input_fields_are_dropped() {
        let def = parse(
            "inputs:\n  token:\n    required: true\n    deprecationMessage: old\n",
        );
        let json = serde_json::to_value(&def.inputs[0]).unwrap();
        assert!(json.get("deprecationMessage").is_none());
    }

    #[test]
    fn scalar_string_fields_keep_their_value() {
        let def = parse("name: 123\ninputs:\n  token:\n    description: 42\n");
        assert_eq!(def.name, "123");
        assert_eq!(def.inputs[0].description, "42");
    }

    // `required` must be a literal YAML boolean. A quoted "true" does not
    // count; this test pins the strictness as deliberate.
    #[test]
    fn quoted_required_is_not_required() {
        let def = parse("inputs:\n  token:\n    required: \"true\"\n");
        assert!(!def.inputs[0].required);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error_with_path() {
        let err =
            parse_definition(b"name: [unclosed", Path::new("bad/action.yml")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad/action.yml"), "got: {msg}");
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let err = parse_definition(b"- just\n- a\n- list\n", Path::new("a.yml")).unwrap_err();
        assert!(matches!(err, ParseError::NotAMapping { .. }));
    }

    #[test]
    fn default_values_keep_their_type() {
        let def = parse(
            "inputs:\n  retries:\n    default: 3\n  verbose:\n    default: false\n  ref:\n    default: main\n",
        );
        assert_eq!(def.inputs[0].default, Some(serde_json::json!(3)));
        assert_eq!(def.inputs[1].default, Some(serde_json::json!(false)));
        assert_eq!(def.inputs[2].default, Some(serde_json::json!("main")));
    }
}
