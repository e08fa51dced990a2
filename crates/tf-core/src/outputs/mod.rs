//! Aggregated outputs — the ordered multi-map built by one collect call.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Flattened mapping from canonical task name to the ordered outputs that
/// task produced across all iterations and nested expansions.
///
/// Append-only while a collect call runs; entries keep first-append order
/// and each list keeps append order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedOutputs(IndexMap<String, Vec<Value>>);

impl AggregatedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one output under a canonical name, creating the list if absent.
    pub fn append(&mut self, name: impl Into<String>, output: Value) {
        self.0.entry(name.into()).or_default().push(output);
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct canonical names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Total number of collected outputs across all names.
    pub fn total_outputs(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.0.iter().map(|(name, outputs)| (name.as_str(), outputs.as_slice()))
    }

    /// Plain JSON view (object of arrays, insertion order), the shape
    /// projection queries evaluate against.
    pub fn to_value(&self) -> Value {
        let mut object = serde_json::Map::with_capacity(self.0.len());
        for (name, outputs) in &self.0 {
            object.insert(name.clone(), Value::Array(outputs.clone()));
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_keeps_list_order() {
        let mut outputs = AggregatedOutputs::new();
        outputs.append("task_a", json!({"x": 1}));
        outputs.append("task_a", json!({"x": 2}));

        assert_eq!(outputs.get("task_a"), Some(&[json!({"x": 1}), json!({"x": 2})][..]));
        assert_eq!(outputs.total_outputs(), 2);
    }

    #[test]
    fn keys_keep_first_append_order() {
        let mut outputs = AggregatedOutputs::new();
        outputs.append("zeta", json!(1));
        outputs.append("alpha", json!(2));
        outputs.append("zeta", json!(3));

        let names: Vec<_> = outputs.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn json_view_matches_contents() {
        let mut outputs = AggregatedOutputs::new();
        outputs.append("task_a", json!({"x": 1}));
        outputs.append("task_b", json!({"y": 2}));

        assert_eq!(
            outputs.to_value(),
            json!({"task_a": [{"x": 1}], "task_b": [{"y": 2}]})
        );
    }

    #[test]
    fn empty_map_serializes_to_empty_object() {
        let outputs = AggregatedOutputs::new();
        assert_eq!(outputs.to_value(), json!({}));
        assert!(outputs.is_empty());
        assert_eq!(outputs.len(), 0);
    }
}
