//! Table-name derivation.

/// Derives a table name from an entity name: a lowercase letter
/// immediately followed by an uppercase letter gains an underscore
/// between them, double underscores collapse, and the result is
/// lowercased (`BookList` → `book_list`).
#[must_use]
pub fn table_name(entity: &str) -> String {
    let mut result = String::with_capacity(entity.len() + 4);
    let mut prev_lower = false;
    for c in entity.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            result.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        result.push(c.to_ascii_lowercase());
    }
    while result.contains("__") {
        result = result.replace("__", "_");
    }
    result
}
