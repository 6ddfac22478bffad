//! Range query helpers for prefix scans.

/// Calculate the exclusive end bound for a prefix range query.
///
/// Given prefix "sid:2024-03-05:", returns "sid:2024-03-05;" (next ASCII char after ':').
/// Every key starting with the prefix sorts below the returned bound.
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Key bounds `[start, end)` covering every day from `first` to `last`
/// inclusive under `owner`.
pub fn day_range_bounds(owner: &str, first: &str, last: &str) -> (String, String) {
    (
        format!("{}:{}:", owner, first),
        prefix_end_bound(&format!("{}:{}:", owner, last)),
    )
}
