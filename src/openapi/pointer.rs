//! JSON Pointer lookup over generic documents
//!
//! Only map traversal is supported: a segment that lands on anything other
//! than an object, or names a missing key, yields `None`.

use serde_json::Value;

/// Resolve `pointer` against `document`.
///
/// A leading `/` is ignored and an empty pointer designates the whole
/// document. Segments are unescaped (`~1` is `/`, `~0` is `~`) before lookup.
///
/// # Examples
/// ```
/// use apigw_sync::openapi::pointer::resolve;
/// use serde_json::json;
///
/// let doc = json!({"a": {"b": {"c": 1}}});
/// assert_eq!(resolve(&doc, "/a/b/c"), Some(&json!(1)));
/// assert_eq!(resolve(&doc, "/a/x"), None);
/// assert_eq!(resolve(&doc, ""), Some(&doc));
/// ```
pub fn resolve<'a>(document: &'a Value, pointer: &str) -> Option<&'a Value> {
    let trimmed = pointer.strip_prefix('/').unwrap_or(pointer);
    if trimmed.is_empty() {
        return Some(document);
    }

    trimmed.split('/').try_fold(document, |node, segment| match node {
        Value::Object(map) => map.get(&unescape_segment(segment)),
        _ => None,
    })
}

/// Undo RFC 6901 escaping for a single segment
pub fn unescape_segment(segment: &str) -> String {
    if segment.contains('~') {
        segment.replace("~1", "/").replace("~0", "~")
    } else {
        segment.to_string()
    }
}
