//! Dotted path lookup into a value tree
//!
//! Paths are dot-separated keys, each optionally followed by a single
//! `[index]`: `data.items[2].id`. A segment that does not fit the value it
//! is applied to yields `None` (absent), which callers keep distinct from a
//! present `Value::Null`.

use super::Value;

/// Resolve `path` against `root`.
///
/// The empty path resolves to `root` itself.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.')
        .try_fold(root, |current, segment| step(current, segment))
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    let (key, index) = parse_segment(segment)?;
    let current = if key.is_empty() {
        current
    } else {
        current.as_map()?.get(key)?
    };
    match index {
        Some(i) => current.as_list()?.get(i),
        None => Some(current),
    }
}

/// Split `key[3]` into its key and index. A bare `[3]` indexes the current
/// value; an empty segment is invalid.
fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    let Some(open) = segment.find('[') else {
        return (!segment.is_empty()).then_some((segment, None));
    };
    let index = segment[open + 1..].strip_suffix(']')?.parse().ok()?;
    Some((&segment[..open], Some(index)))
}
