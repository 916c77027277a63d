//! Dotted path writes into nested JSON objects.

use serde_json::{Map, Value};

/// Write `value` at the dotted `path` inside `target`.
///
/// Intermediate segments reuse an existing object or replace whatever else
/// sits at that key with a new one. The leaf is overwritten. Siblings are
/// kept at every level.
pub fn set_value(path: &str, value: Value, target: &mut Map<String, Value>) {
    let mut segments = path.split('.').peekable();
    let mut current = target;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }

        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot.as_object_mut() {
            Some(object) => object,
            None => return,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_set_flat_value() {
        let mut target = Map::new();
        set_value("name", json!("John"), &mut target);
        assert_eq!(Value::Object(target), json!({"name": "John"}));
    }

    #[test]
    fn test_set_nested_keeps_siblings() {
        let mut target = object(json!({"a": {"b": 1}}));
        set_value("a.c", json!(2), &mut target);
        assert_eq!(Value::Object(target), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_scalar_replaced_by_object() {
        let mut target = object(json!({"a": 5}));
        set_value("a.b", json!(1), &mut target);
        assert_eq!(Value::Object(target), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_leaf_overwritten() {
        let mut target = object(json!({"a": {"b": {"deep": true}}}));
        set_value("a.b", json!("flat"), &mut target);
        assert_eq!(Value::Object(target), json!({"a": {"b": "flat"}}));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut target = Map::new();
        set_value("person.name", json!("John"), &mut target);
        set_value("person.age", json!(30), &mut target);
        assert_eq!(
            serde_json::to_string(&target).unwrap(),
            r#"{"person":{"name":"John","age":30}}"#
        );
    }
}
