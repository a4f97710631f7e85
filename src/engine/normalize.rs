/// Canonicalize a free-text station label for graph matching.
///
/// Data entry is inconsistent: the same station shows up as "TAIPEI",
/// "Taipei (north)", "TAIPEI/2F" or "TAIPEI #3". The canonical form is the
/// substring before the first `(`, `/` or whitespace, then truncated before
/// a `#` qualifier when the `#` is not the leading character (a station may
/// literally be named "#1CCB"), trimmed and upper-cased.
///
/// The result is used only for graph construction and path matching and is
/// never written back to storage.
pub fn normalize_station(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let cut = trimmed
        .char_indices()
        .find(|&(_, c)| c == '(' || c == '/' || c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let mut head = &trimmed[..cut];

    // A '#' past the first character marks a qualifier suffix; a leading '#'
    // is part of the name itself.
    if let Some(hash) = head.char_indices().find(|&(i, c)| c == '#' && i > 0) {
        head = &head[..hash.0];
    }

    head.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_station("taipei"), "TAIPEI");
        assert_eq!(normalize_station("  Hsinchu  "), "HSINCHU");
        assert_eq!(normalize_station(""), "");
        assert_eq!(normalize_station("   "), "");
    }

    #[test]
    fn test_normalize_suffixes() {
        assert_eq!(normalize_station("Taipei (north)"), "TAIPEI");
        assert_eq!(normalize_station("TAIPEI/2F"), "TAIPEI");
        assert_eq!(normalize_station("TAIPEI 2F annex"), "TAIPEI");
        assert_eq!(normalize_station("A#1"), "A");
    }

    #[test]
    fn test_normalize_leading_hash_preserved() {
        assert_eq!(normalize_station("#1CCB"), "#1CCB");
        assert_eq!(normalize_station("#1CCB#2"), "#1CCB");
    }

    #[test]
    fn test_normalize_idempotent() {
        for s in ["Taipei (north)", "#1CCB", "a/b c#d", "", "x#y#z", "ZH-01"] {
            let once = normalize_station(s);
            assert_eq!(normalize_station(&once), once, "not idempotent for {:?}", s);
        }
    }
}
