//! Key prefix → destination table routing.

use sync_core::DestinationBinding;

/// Bindings a record with key prefix `prefix` is routed to.
///
/// A binding matches when its table name contains the prefix, compared
/// case-sensitively, so one prefix can feed a family of tables
/// (`haodf` → `scrapy_haodf`, `scrapy_haodf_doc`). Matches keep
/// configuration order. No match is a valid result.
pub fn resolve_destinations<'a>(
    prefix: &str,
    bindings: &'a [DestinationBinding],
) -> Vec<&'a DestinationBinding> {
    if prefix.is_empty() {
        return Vec::new();
    }
    bindings
        .iter()
        .filter(|binding| binding.table.contains(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Vec<DestinationBinding> {
        vec![
            DestinationBinding::new("scrapy_xywy", "xywy"),
            DestinationBinding::new("scrapy_haodf", "haodf"),
            DestinationBinding::new("scrapy_haodf_doc", "haodf_doc"),
        ]
    }

    #[test]
    fn test_substring_match() {
        let bindings = bindings();
        let tables: Vec<&str> = resolve_destinations("haodf", &bindings)
            .iter()
            .map(|b| b.table.as_str())
            .collect();
        assert_eq!(tables, vec!["scrapy_haodf", "scrapy_haodf_doc"]);
    }

    #[test]
    fn test_does_not_match_other_family() {
        let bindings = bindings();
        let matched = resolve_destinations("xywy", &bindings);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].table, "scrapy_xywy");
    }

    #[test]
    fn test_case_sensitive() {
        let bindings = bindings();
        assert!(resolve_destinations("HAODF", &bindings).is_empty());
    }

    #[test]
    fn test_no_match_and_empty_prefix() {
        let bindings = bindings();
        assert!(resolve_destinations("sprain", &bindings).is_empty());
        assert!(resolve_destinations("", &bindings).is_empty());
    }
}
