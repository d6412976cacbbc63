//! Country and region name resolution.

/// Common spellings that the API names differently.
const ALIASES: &[(&str, &str)] = &[("north america", "northern america"), ("usa", "us")];

/// Lowercase and trim a user query, then apply known aliases.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    let query = query.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(from, _)| *from == query)
        .map_or(query, |(_, to)| (*to).to_string())
}

/// Resolve a query against named items, case-insensitively.
///
/// Tries exact equality, then prefix, then substring containment; the first
/// item matching the earliest rule wins. `None` means "not found".
///
/// ```
/// use ecodash_core::resolve::resolve_by_name;
/// let names = ["United States", "United"];
/// let found = resolve_by_name(&names, "united", |n| *n);
/// assert_eq!(found, Some(&"United"));
/// ```
pub fn resolve_by_name<'a, T, F>(items: &'a [T], query: &str, name: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    let query = query.to_lowercase();
    let lowered: Vec<String> = items.iter().map(|item| name(item).to_lowercase()).collect();

    let position = lowered
        .iter()
        .position(|n| *n == query)
        .or_else(|| lowered.iter().position(|n| n.starts_with(&query)))
        .or_else(|| lowered.iter().position(|n| n.contains(&query)))?;

    items.get(position)
}
