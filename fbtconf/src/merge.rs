//! Last-write-wins table merging.
//!
//! Tables merge key-wise at every depth; any other value (scalars, arrays)
//! from the overriding layer replaces the existing value as a whole. This is
//! what lets a local file add one profile to a profile map without restating
//! the others, while a list assignment still replaces the list.

use toml::{Table, Value};

/// Merge `over` into `base` and return the dotted paths of every leaf `over`
/// assigned, in assignment order.
pub fn merge_tables(base: &mut Table, over: Table) -> Vec<String> {
    let mut touched = Vec::new();
    merge_at(base, over, "", &mut touched);
    touched
}

fn merge_at(base: &mut Table, over: Table, prefix: &str, touched: &mut Vec<String>) {
    for (key, value) in over {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_at(existing, incoming, &path, touched);
            }
            (_, Value::Table(incoming)) => {
                // New table: record its leaves so provenance stays per-entry.
                let mut fresh = Table::new();
                merge_at(&mut fresh, incoming, &path, touched);
                base.insert(key, Value::Table(fresh));
            }
            (_, value) => {
                base.insert(key, value);
                touched.push(path);
            }
        }
    }
}
