//! Purpose: Resolve dotted/bracketed field names into a nested result tree.
//! Exports: `assign`.
//! Role: Pure assignment algorithm shared by the field and file paths of a decode.
//! Invariants: Never errors; malformed bracket syntax degrades to a literal key.
//! Invariants: Append positions reflect decode arrival order, not source order.
//! Invariants: Shape conflicts resolve last-shape-wins; duplicate indices last-write-wins.

use serde_json::{Map, Value};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Step {
    Key(String),
    Index(usize),
    Append,
}

/// Assign `value` into `tree` at the address named by `raw_name`.
///
/// Segments are separated by `.`; a segment may carry one trailing `[]`
/// (append to the next free array slot) or `[N]` (explicit array index).
/// Intermediate containers are created on demand, replacing any value of
/// the wrong shape already sitting at that slot.
pub fn assign(tree: &mut Value, raw_name: &str, value: Value) {
    let mut slot = tree;
    for step in parse_path(raw_name) {
        slot = descend(slot, step);
    }
    *slot = value;
}

fn parse_path(raw: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    for segment in raw.split('.') {
        match split_bracket(segment) {
            Some((key, bracket)) => {
                if !key.is_empty() {
                    steps.push(Step::Key(key.to_string()));
                }
                steps.push(bracket);
            }
            None => steps.push(Step::Key(segment.to_string())),
        }
    }
    steps
}

fn split_bracket(segment: &str) -> Option<(&str, Step)> {
    let rest = segment.strip_suffix(']')?;
    let open = rest.rfind('[')?;
    let inside = &rest[open + 1..];
    let key = &rest[..open];
    if inside.is_empty() {
        return Some((key, Step::Append));
    }
    let index: usize = inside.parse().ok()?;
    Some((key, Step::Index(index)))
}

fn descend(slot: &mut Value, step: Step) -> &mut Value {
    match step {
        Step::Key(key) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            match slot {
                Value::Object(map) => map.entry(key).or_insert(Value::Null),
                _ => slot,
            }
        }
        Step::Index(index) => {
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(items) => {
                    while items.len() <= index {
                        items.push(Value::Null);
                    }
                    &mut items[index]
                }
                _ => slot,
            }
        }
        Step::Append => {
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(items) => {
                    items.push(Value::Null);
                    let end = items.len() - 1;
                    &mut items[end]
                }
                _ => slot,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assign;
    use serde_json::{Value, json};

    fn tree() -> Value {
        json!({})
    }

    #[test]
    fn dotted_names_build_nested_objects_in_any_order() {
        let mut forward = tree();
        assign(&mut forward, "user.name", json!("ada"));
        assign(&mut forward, "user.address.city", json!("london"));
        assign(&mut forward, "active", json!("yes"));

        let mut reversed = tree();
        assign(&mut reversed, "active", json!("yes"));
        assign(&mut reversed, "user.address.city", json!("london"));
        assign(&mut reversed, "user.name", json!("ada"));

        let expected = json!({
            "user": {"name": "ada", "address": {"city": "london"}},
            "active": "yes",
        });
        assert_eq!(forward, expected);
        assert_eq!(reversed, expected);
    }

    #[test]
    fn append_preserves_arrival_order_across_interleaved_fields() {
        let mut root = tree();
        assign(&mut root, "a[]", json!(1));
        assign(&mut root, "unrelated", json!("x"));
        assign(&mut root, "other.nested", json!("y"));
        assign(&mut root, "a[]", json!(2));
        assert_eq!(root["a"], json!([1, 2]));
    }

    #[test]
    fn explicit_index_overwrites_last_write_wins() {
        let mut root = tree();
        assign(&mut root, "a[0]", json!("x"));
        assign(&mut root, "a[0]", json!("y"));
        assert_eq!(root["a"], json!(["y"]));
    }

    #[test]
    fn explicit_index_grows_array_with_null_slots() {
        let mut root = tree();
        assign(&mut root, "a[2]", json!("z"));
        assert_eq!(root["a"], json!([null, null, "z"]));
    }

    #[test]
    fn indexed_segments_nest_into_objects() {
        let mut root = tree();
        assign(&mut root, "items[0].name", json!("first"));
        assign(&mut root, "items[1].name", json!("second"));
        assert_eq!(
            root["items"],
            json!([{"name": "first"}, {"name": "second"}])
        );
    }

    #[test]
    fn scalar_collision_redefines_slot_as_object() {
        let mut root = tree();
        assign(&mut root, "a", json!("scalar"));
        assign(&mut root, "a.b", json!("nested"));
        assert_eq!(root, json!({"a": {"b": "nested"}}));
    }

    #[test]
    fn array_collision_redefines_slot_as_object() {
        let mut root = tree();
        assign(&mut root, "a[]", json!(1));
        assign(&mut root, "a.b", json!(2));
        assert_eq!(root, json!({"a": {"b": 2}}));
    }

    #[test]
    fn object_collision_redefines_slot_as_array() {
        let mut root = tree();
        assign(&mut root, "a.b", json!(1));
        assign(&mut root, "a[]", json!(2));
        assert_eq!(root, json!({"a": [2]}));
    }

    #[test]
    fn malformed_brackets_degrade_to_literal_keys() {
        let mut root = tree();
        assign(&mut root, "a[x]", json!(1));
        assign(&mut root, "b[", json!(2));
        assign(&mut root, "c]", json!(3));
        assert_eq!(root, json!({"a[x]": 1, "b[": 2, "c]": 3}));
    }

    #[test]
    fn terminal_assignment_overwrites_previous_scalar() {
        let mut root = tree();
        assign(&mut root, "a.b", json!("old"));
        assign(&mut root, "a.b", json!("new"));
        assert_eq!(root, json!({"a": {"b": "new"}}));
    }
}
