//! Helpers over raw `serde_json::Value` documents.
//!
//! The typed model in [`crate::config`] covers the recognized fields; these helpers work on
//! the untyped form for the things that must not depend on it: structural comparison of two
//! documents, dotted-path reads and writes for command-line overrides, recursive default
//! filling and the bookkeeping that keeps explicit `null` members alive through the typed
//! model.

use serde::de::{self, Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::error::{ApexConfigError, Result};

/// Structural equivalence of two JSON documents.
///
/// Object keys compare order-insensitively and arrays compare element by element in order.
/// Numbers compare by value, so `1` and `1.0` are equivalent. An explicit `null` member is
/// not equivalent to an absent one.
pub fn equivalent(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(x, y)| equivalent(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(key, x)| ym.get(key).map_or(false, |y| equivalent(x, y)))
        }
        _ => a == b,
    }
}

/// A non-negative integer, also when written as a whole float such as `10000.0`
pub fn as_whole_u64(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_u64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// `deserialize_with` for optional counts: accepts `64` and `64.0`, rejects `64.5` and `-1`
pub fn whole_number<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => as_whole_u64(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative whole number, got {}", value))),
    }
}

/// Paths, as key or index segments, of every object member that is an explicit `null`
pub fn null_paths(value: &Value) -> Vec<Vec<String>> {
    let mut paths = Vec::new();
    collect_null_paths(value, &mut Vec::new(), &mut paths);
    paths
}

fn collect_null_paths(value: &Value, prefix: &mut Vec<String>, paths: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(map) => {
            for (key, member) in map {
                prefix.push(key.clone());
                if member.is_null() {
                    paths.push(prefix.clone());
                } else {
                    collect_null_paths(member, prefix, paths);
                }
                prefix.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                prefix.push(index.to_string());
                collect_null_paths(item, prefix, paths);
                prefix.pop();
            }
        }
        _ => {}
    }
}

/// Keep only the recorded `null` paths whose member is absent from `value`
pub fn retain_dropped_nulls(value: &Value, paths: &mut Vec<Vec<String>>) {
    paths.retain(|path| {
        let mut current = Some(value);
        for segment in path {
            current = match current {
                Some(Value::Object(map)) => map.get(segment),
                Some(Value::Array(items)) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
                _ => None,
            };
        }
        current.is_none()
    });
}

/// Put back `null` members recorded by [`null_paths`].
///
/// A member is restored only where its parent object still exists and the key is absent,
/// so values written since the paths were recorded win.
pub fn restore_nulls(value: &mut Value, paths: &[Vec<String>]) {
    for path in paths {
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let mut current = Some(&mut *value);
        for segment in parents {
            current = match current {
                Some(Value::Object(map)) => map.get_mut(segment),
                Some(Value::Array(items)) => match segment.parse::<usize>() {
                    Ok(index) => items.get_mut(index),
                    Err(_) => None,
                },
                _ => None,
            };
        }
        if let Some(Value::Object(map)) = current {
            if !map.contains_key(last) {
                map.insert(last.clone(), Value::Null);
            }
        }
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
        return Err(ApexConfigError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

fn parse_index(path: &str, segment: &str) -> Result<usize> {
    segment
        .parse::<usize>()
        .map_err(|_| ApexConfigError::InvalidPath(format!("{} (expected array index, got '{}')", path, segment)))
}

/// Read the value at a dotted path such as `update_spec.batch_size` or `network_spec.0.units`.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = split_path(path).ok()?;
    let mut current = value;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `new_value` at a dotted path, creating intermediate objects as needed.
///
/// Numeric segments index into arrays; an index equal to the array length appends.
pub fn set_path(value: &mut Value, path: &str, new_value: Value) -> Result<()> {
    let segments = split_path(path)?;
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ApexConfigError::InvalidPath(path.to_string()))?;

    let mut current = value;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let index = parse_index(path, segment)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| ApexConfigError::InvalidPath(format!("{} (index {} out of range)", path, index)))?
            }
            _ => {
                return Err(ApexConfigError::InvalidPath(format!(
                    "{} ('{}' is not an object or array)",
                    path, segment
                )))
            }
        };
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), new_value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(path, last)?;
            if index < items.len() {
                items[index] = new_value;
                Ok(())
            } else if index == items.len() {
                items.push(new_value);
                Ok(())
            } else {
                Err(ApexConfigError::InvalidPath(format!("{} (index {} out of range)", path, index)))
            }
        }
        _ => Err(ApexConfigError::InvalidPath(format!(
            "{} (parent of '{}' is a scalar)",
            path, last
        ))),
    }
}

/// Recursively insert every key of `defaults` that `target` lacks.
///
/// Present values are never overwritten; nested objects are merged key by key.
pub fn merge_defaults(target: &mut Value, defaults: &Value) {
    let (Value::Object(target_map), Value::Object(default_map)) = (target, defaults) else {
        return;
    };
    for (key, default_value) in default_map {
        match target_map.get_mut(key) {
            None => {
                target_map.insert(key.clone(), default_value.clone());
            }
            Some(existing) => merge_defaults(existing, default_value),
        }
    }
}

/// Parse a `path=value` override. The value is read as JSON when it parses, otherwise it is
/// taken as a plain string, so `optimizer_spec.type=sgd` works without quoting.
pub fn parse_override(input: &str) -> Result<(String, Value)> {
    let (path, raw) = input
        .split_once('=')
        .ok_or_else(|| ApexConfigError::invalid_parameter("override", format!("'{}' is not of the form path=value", input)))?;
    let path = path.trim();
    split_path(path)?;
    let raw = raw.trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equivalent_ignores_key_order_and_number_repr() {
        let a = json!({"a": 1, "b": {"c": 0.5, "d": [1, 2]}});
        let b = json!({"b": {"d": [1.0, 2], "c": 0.5}, "a": 1.0});
        assert!(equivalent(&a, &b));
    }

    #[test]
    fn test_equivalent_respects_array_order() {
        let a = json!({"layers": [{"units": 1}, {"units": 2}]});
        let b = json!({"layers": [{"units": 2}, {"units": 1}]});
        assert!(!equivalent(&a, &b));
    }

    #[test]
    fn test_equivalent_distinguishes_null_from_absent() {
        let a = json!({"redis_address": null, "num_cpus": 4});
        let b = json!({"num_cpus": 4});
        assert!(!equivalent(&a, &b));
        assert!(!equivalent(&b, &a));
        assert!(equivalent(&a, &a.clone()));
        assert!(!equivalent(&json!({"x": 0}), &json!({})));
    }

    #[test]
    fn test_whole_numbers() {
        assert_eq!(as_whole_u64(&json!(10000)), Some(10000));
        assert_eq!(as_whole_u64(&json!(10000.0)), Some(10000));
        assert_eq!(as_whole_u64(&json!(0.5)), None);
        assert_eq!(as_whole_u64(&json!(-1)), None);
        assert_eq!(as_whole_u64(&json!(-2.0)), None);
        assert_eq!(as_whole_u64(&json!("64")), None);
    }

    #[test]
    fn test_null_paths_are_restored() {
        let doc = json!({
            "execution_spec": {"ray_spec": {"executor_spec": {"redis_address": null, "num_cpus": 4}}},
            "network_spec": [{"type": "dense", "scope": null}],
            "summary_spec": null
        });
        let paths = null_paths(&doc);
        assert_eq!(paths.len(), 3);

        let mut stripped = json!({
            "execution_spec": {"ray_spec": {"executor_spec": {"num_cpus": 4}}},
            "network_spec": [{"type": "dense"}]
        });
        restore_nulls(&mut stripped, &paths);
        assert_eq!(stripped, doc);

        // A value written since wins over the recorded null
        let mut rewritten = json!({"summary_spec": {"save_secs": 60}});
        restore_nulls(&mut rewritten, &paths);
        assert_eq!(rewritten, json!({"summary_spec": {"save_secs": 60}}));

        let mut remaining = paths.clone();
        retain_dropped_nulls(&rewritten, &mut remaining);
        assert_eq!(remaining.len(), 2);
        assert!(!remaining.contains(&vec!["summary_spec".to_string()]));
    }

    #[test]
    fn test_get_and_set_path() {
        let mut doc = json!({"update_spec": {"batch_size": 64}, "network_spec": [{"units": 8}]});
        assert_eq!(get_path(&doc, "update_spec.batch_size"), Some(&json!(64)));
        assert_eq!(get_path(&doc, "network_spec.0.units"), Some(&json!(8)));
        assert_eq!(get_path(&doc, "network_spec.3.units"), None);

        set_path(&mut doc, "update_spec.batch_size", json!(32)).unwrap();
        set_path(&mut doc, "network_spec.0.units", json!(16)).unwrap();
        set_path(&mut doc, "optimizer_spec.learning_rate", json!(0.001)).unwrap();
        assert_eq!(doc["update_spec"]["batch_size"], json!(32));
        assert_eq!(doc["network_spec"][0]["units"], json!(16));
        assert_eq!(doc["optimizer_spec"]["learning_rate"], json!(0.001));
    }

    #[test]
    fn test_set_path_errors() {
        let mut doc = json!({"discount": 0.99, "network_spec": []});
        assert!(set_path(&mut doc, "", json!(1)).is_err());
        assert!(set_path(&mut doc, "a..b", json!(1)).is_err());
        assert!(set_path(&mut doc, "discount.value", json!(1)).is_err());
        assert!(set_path(&mut doc, "network_spec.2", json!(1)).is_err());
        assert!(set_path(&mut doc, "network_spec.x", json!(1)).is_err());
    }

    #[test]
    fn test_merge_defaults_keeps_existing() {
        let mut target = json!({"job": "worker", "cluster_spec": {"ps": ["a:1"]}});
        let defaults = json!({
            "job": "ps",
            "task_index": 0,
            "cluster_spec": {"ps": ["localhost:22222"], "worker": ["localhost:22223"]}
        });
        merge_defaults(&mut target, &defaults);
        assert_eq!(target["job"], json!("worker"));
        assert_eq!(target["task_index"], json!(0));
        assert_eq!(target["cluster_spec"]["ps"], json!(["a:1"]));
        assert_eq!(target["cluster_spec"]["worker"], json!(["localhost:22223"]));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("update_spec.batch_size=32").unwrap(),
            ("update_spec.batch_size".to_string(), json!(32))
        );
        assert_eq!(
            parse_override("optimizer_spec.type = sgd").unwrap(),
            ("optimizer_spec.type".to_string(), json!("sgd"))
        );
        assert!(parse_override("no_equals_sign").is_err());
        assert!(parse_override("=5").is_err());
    }
}
