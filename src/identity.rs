//! Display name collapsing
//!
//! Derives a single display name from the ordered name fragments a contact
//! directory supplies.

/// Collapse ordered name fragments (first, last, organization) into one
/// display name.
///
/// Absent and empty fragments are skipped; the rest are joined with a single
/// space in their original order. Callers must supply all three fragment
/// slots; the fixed-size array enforces that at compile time.
///
/// All fragments absent yields the empty string, which callers must preserve:
/// a matched contact with no name is distinct from an identifier that matched
/// no contact at all.
#[must_use]
pub fn collapse_name_fragments(fragments: [Option<&str>; 3]) -> String {
    fragments
        .iter()
        .flatten()
        .filter(|fragment| !fragment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}
