use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::plan::GridDimension;

/// One assignment of a rendered value per dimension, plus the plan's
/// non-swept parameters. Constructed transiently per iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    entries: Vec<(String, String)>,
    fixed: Vec<(String, String)>,
}

impl Combination {
    /// Looks up a rendered value by dimension or fixed-parameter name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .chain(self.fixed.iter())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Human label identifying the combination, dimensions only, in declared
    /// order (`dataset=flickr epsilon=1.0`).
    pub fn label(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full parameter set (dimensions and fixed values) as a JSON object.
    pub fn params_value(&self) -> Value {
        let ordered: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .chain(self.fixed.iter())
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let mut map = Map::new();
        for (key, value) in ordered {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        Value::Object(map)
    }
}

/// Renders a plan value for command-line and path substitution. JSON strings
/// render bare; everything else uses its JSON text, so YAML `3.0` stays `3.0`.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Expands the Cartesian product of the dimensions in nested-loop order: the
/// first declared dimension varies slowest, values in declared order.
pub fn expand_grid(dimensions: &[GridDimension], fixed: &BTreeMap<String, Value>) -> Vec<Combination> {
    let fixed: Vec<(String, String)> = fixed
        .iter()
        .map(|(key, value)| (key.clone(), render_value(value)))
        .collect();
    let mut outputs = Vec::new();
    expand(dimensions, 0, Vec::new(), &fixed, &mut outputs);
    outputs
}

fn expand(
    dimensions: &[GridDimension],
    idx: usize,
    current: Vec<(String, String)>,
    fixed: &[(String, String)],
    outputs: &mut Vec<Combination>,
) {
    if idx == dimensions.len() {
        outputs.push(Combination {
            entries: current,
            fixed: fixed.to_vec(),
        });
        return;
    }
    let dimension = &dimensions[idx];
    for value in &dimension.values {
        let mut next = current.clone();
        next.push((dimension.name.clone(), render_value(value)));
        expand(dimensions, idx + 1, next, fixed, outputs);
    }
}
