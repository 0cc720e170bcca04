//! Merging caller overrides into a generated app data document.
//!
//! Overrides win over the base document. Objects compose recursively, while
//! arrays and scalars from the override replace the base value and a `null`
//! override removes the key. The `hooks` category is the exception: when an
//! override carries hooks, they replace the base hooks wholesale so that hooks
//! injected by the base document are never duplicated or partially kept.

use {
    crate::schema::Category,
    serde_json::{Map, Value},
};

/// How an override for a metadata category combines with the base value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MergePolicy {
    Compose,
    Replace,
}

impl Category {
    pub fn merge_policy(self) -> MergePolicy {
        match self {
            Category::Hooks => MergePolicy::Replace,
            _ => MergePolicy::Compose,
        }
    }
}

/// Merges `overrides` into the `base` document.
pub fn merge_document(base: Value, overrides: Value) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                if key == "metadata" {
                    let merged = match (base.remove(&key), value) {
                        (Some(Value::Object(base)), Value::Object(overrides)) => {
                            Value::Object(merge_metadata(base, overrides))
                        }
                        (base, value) => merge_entry(base, value),
                    };
                    insert_unless_null(&mut base, key, merged);
                } else {
                    let merged = merge_entry(base.remove(&key), value);
                    insert_unless_null(&mut base, key, merged);
                }
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

fn merge_metadata(mut base: Map<String, Value>, overrides: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in overrides {
        let policy = Category::from_key(&key)
            .map(Category::merge_policy)
            .unwrap_or(MergePolicy::Compose);
        let merged = match policy {
            MergePolicy::Replace => value,
            MergePolicy::Compose => merge_entry(base.remove(&key), value),
        };
        insert_unless_null(&mut base, key, merged);
    }
    base
}

fn merge_entry(base: Option<Value>, value: Value) -> Value {
    match (base, value) {
        (Some(Value::Object(mut base)), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let merged = merge_entry(base.remove(&key), value);
                insert_unless_null(&mut base, key, merged);
            }
            Value::Object(base)
        }
        (_, value) => value,
    }
}

fn insert_unless_null(map: &mut Map<String, Value>, key: String, value: Value) {
    if value.is_null() {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}
