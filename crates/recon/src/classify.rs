use crate::model::Category;

/// Leading characters skipped before the marker. Stored codes may carry
/// them; extracted codes never do. The store's category filter skips the same set.
pub const LEADING_BLANKS: [char; 4] = [' ', '\t', '\n', '\r'];

/// Stock category from the code's first character.
///
/// `#` → complementary, `*` → OEM, anything else (including an empty string
/// or a code that opens with a digit) → standard. Total: no error path.
/// Leading [`LEADING_BLANKS`] are not part of a code and are skipped.
pub fn classify(code: &str) -> Category {
    match code.trim_start_matches(LEADING_BLANKS).chars().next() {
        Some('#') => Category::Complementary,
        Some('*') => Category::Oem,
        _ => Category::Standard,
    }
}

/// Category for an optional stored code; a missing code counts as standard.
pub fn classify_opt(code: Option<&str>) -> Category {
    code.map(classify).unwrap_or(Category::Standard)
}
