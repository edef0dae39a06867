use std::error::Error;

/// Render an error and all of its sources as `outer: inner: root`.
///
/// Adjacent duplicates are dropped; some wrappers repeat their cause verbatim.
pub(crate) fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        if parts.last() != Some(&text) && !text.is_empty() {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}
