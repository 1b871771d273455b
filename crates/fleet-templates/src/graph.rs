//! Job graph representation, placeholder substitution, and adapter
//! splicing.
//!
//! A graph is a mapping from integer-valued string node identifiers to
//! `{class_type, inputs: {<name>: <literal or [src_node_id, src_output_index]>}}`.

use std::collections::HashMap;
use std::sync::OnceLock;

use fleet_core::AdapterSpec;
use serde_json::{Map, Value};

pub type Graph = Map<String, Value>;

const CHECKPOINT_CLASS_TYPES: &[&str] = &["CheckpointLoaderSimple", "CheckpointLoader"];

fn placeholder_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{(\w+)\}\}").unwrap())
}

/// Recursively substitutes `{{name}}` placeholders across all
/// string-valued ports. A port whose entire value is `{{name}}` receives
/// the typed value; an embedded placeholder is stringified. Unknown
/// placeholders are left literal.
pub fn substitute(value: &Value, values: &HashMap<String, Value>) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), substitute(v, values));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute(v, values)).collect())
        }
        Value::String(s) => {
            let re = placeholder_re();
            if let Some(caps) = re.captures(s) {
                if caps.get(0).unwrap().as_str() == s.as_str() {
                    let key = &caps[1];
                    if let Some(typed) = values.get(key) {
                        return typed.clone();
                    }
                    return value.clone();
                }
            }
            let replaced = re.replace_all(s, |caps: &regex::Captures| {
                let key = &caps[1];
                match values.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => caps[0].to_string(),
                }
            });
            Value::String(replaced.into_owned())
        }
        other => other.clone(),
    }
}

fn node_inputs_mut(graph: &mut Graph, node_id: &str) -> Option<&mut Map<String, Value>> {
    graph
        .get_mut(node_id)?
        .as_object_mut()?
        .get_mut("inputs")?
        .as_object_mut()
}

fn find_base_loader(graph: &Graph) -> Option<String> {
    graph.iter().find_map(|(id, node)| {
        let class_type = node.get("class_type")?.as_str()?;
        CHECKPOINT_CLASS_TYPES
            .contains(&class_type)
            .then(|| id.clone())
    })
}

/// A port referencing `[src_node_id, src_output_index]`.
fn edge_source<'a>(value: &'a Value) -> Option<(&'a str, i64)> {
    let arr = value.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    let src_id = arr[0].as_str()?;
    let src_output = arr[1].as_i64()?;
    Some((src_id, src_output))
}

fn next_node_id_base(graph: &Graph) -> i64 {
    let max_id = graph
        .keys()
        .filter_map(|k| k.parse::<i64>().ok())
        .max()
        .unwrap_or(0);
    (max_id / 100 + 1) * 100
}

/// Locates the base-model loader, enumerates its model/clip consumers,
/// and splices in the ordered adapter chain. A no-op for an empty
/// adapter list. If the base loader is absent, logs and returns the
/// graph unchanged.
pub fn splice_adapters(mut graph: Graph, adapters: &[AdapterSpec]) -> Graph {
    if adapters.is_empty() {
        return graph;
    }

    let Some(base_id) = find_base_loader(&graph) else {
        tracing::warn!("no base-model loader found, skipping adapter splicing");
        return graph;
    };

    // Collect consumers before any mutation, per the design note on
    // avoiding transient inconsistent references under batch rewrites.
    let mut model_consumers = Vec::new();
    let mut clip_consumers = Vec::new();
    for (node_id, node) in graph.iter() {
        let Some(inputs) = node.get("inputs").and_then(|v| v.as_object()) else {
            continue;
        };
        for (input_key, input_val) in inputs {
            let Some((src_id, src_output)) = edge_source(input_val) else {
                continue;
            };
            if src_id != base_id {
                continue;
            }
            match src_output {
                0 => model_consumers.push((node_id.clone(), input_key.clone())),
                1 => clip_consumers.push((node_id.clone(), input_key.clone())),
                _ => {}
            }
        }
    }

    let mut next_id = next_node_id_base(&graph);
    let mut prev_model: (String, i64) = (base_id.clone(), 0);
    let mut prev_clip: (String, i64) = (base_id, 1);
    let mut new_nodes = Vec::with_capacity(adapters.len());

    for adapter in adapters {
        let node_id = next_id.to_string();
        next_id += 1;

        let node = serde_json::json!({
            "class_type": "LoraLoader",
            "inputs": {
                "lora_name": adapter.name,
                "strength_model": adapter.model_strength,
                "strength_clip": adapter.clip_strength,
                "model": [prev_model.0, prev_model.1],
                "clip": [prev_clip.0, prev_clip.1],
            }
        });
        new_nodes.push((node_id.clone(), node));

        prev_model = (node_id.clone(), 0);
        prev_clip = (node_id, 1);
    }

    for (id, node) in new_nodes {
        graph.insert(id, node);
    }

    for (node_id, input_key) in model_consumers {
        if let Some(inputs) = node_inputs_mut(&mut graph, &node_id) {
            inputs.insert(
                input_key,
                serde_json::json!([prev_model.0.clone(), prev_model.1]),
            );
        }
    }
    for (node_id, input_key) in clip_consumers {
        if let Some(inputs) = node_inputs_mut(&mut graph, &node_id) {
            inputs.insert(
                input_key,
                serde_json::json!([prev_clip.0.clone(), prev_clip.1]),
            );
        }
    }

    tracing::info!(count = adapters.len(), "spliced adapter chain into job graph");
    graph
}
