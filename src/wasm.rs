//! WASM bindings for the skilltree-core library.
//!
//! All functions exposed to JavaScript via wasm-bindgen are defined here.
//! Inputs and outputs are JSON strings; failures come back as an `error`
//! field instead of a thrown exception.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::layout::{LayoutConfig, initialize_layout, layout_skill_tree};
use crate::model::SkillNode;
use crate::output::{ErrorInfo, LayoutOutput};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

/// Parse the node list and optional config. An empty config string means defaults.
fn parse_input(
    nodes_json: &str,
    config_json: &str,
) -> Result<(Vec<SkillNode>, LayoutConfig), ErrorInfo> {
    let nodes: Vec<SkillNode> = serde_json::from_str(nodes_json).map_err(|e| ErrorInfo {
        message: format!("invalid node list: {}", e),
        kind: "input".to_string(),
    })?;
    let cfg = if config_json.trim().is_empty() {
        LayoutConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(|e| ErrorInfo {
            message: format!("invalid layout config: {}", e),
            kind: "config".to_string(),
        })?
    };
    Ok((nodes, cfg))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        console_error(&format!("Error serializing layout: {}", e));
        r#"{"error":{"message":"serialization failed","kind":"output"}}"#.to_string()
    })
}

/// Full renderer document: positioned nodes, dependency edges and bounds.
#[wasm_bindgen]
pub fn layout_tree(nodes_json: &str, config_json: &str) -> String {
    let (nodes, cfg) = match parse_input(nodes_json, config_json) {
        Ok(input) => input,
        Err(e) => {
            console_error(&e.message);
            return to_json(&LayoutOutput::from_error(e));
        }
    };

    match layout_skill_tree(&nodes, &cfg) {
        Ok(result) => to_json(&LayoutOutput::from_result(&result, &cfg)),
        Err(e) => {
            console_error(&format!("Error laying out skill tree: {}", e));
            to_json(&LayoutOutput::from_error(ErrorInfo::from(&e)))
        }
    }
}

/// Bare position map: `{ "<id>": { "x": .., "y": .. } }`.
#[wasm_bindgen]
pub fn node_positions(nodes_json: &str, config_json: &str) -> String {
    let (nodes, cfg) = match parse_input(nodes_json, config_json) {
        Ok(input) => input,
        Err(e) => {
            console_error(&e.message);
            return to_json(&LayoutOutput::from_error(e));
        }
    };

    match initialize_layout(&nodes, &cfg) {
        Ok(positions) => to_json(&positions),
        Err(e) => {
            console_error(&format!("Error laying out skill tree: {}", e));
            to_json(&LayoutOutput::from_error(ErrorInfo::from(&e)))
        }
    }
}

/// Default configuration as JSON, so the front end can show and edit it.
#[wasm_bindgen]
pub fn default_config() -> String {
    to_json(&LayoutConfig::default())
}
