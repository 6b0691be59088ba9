/// The slug a section or page is addressed by: the authored one when present,
/// otherwise the id itself.
pub fn resolve_slug(authored: Option<&str>, id: &str) -> String {
    match authored.map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => id.to_string(),
    }
}
