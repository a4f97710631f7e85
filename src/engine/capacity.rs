use std::cmp::Ordering;

/// Parse the maximum core count encoded in a fiber name prefix.
///
/// Cable names conventionally lead with their core capacity, e.g.
/// "48_trunk_1" is a 48-core cable. A name is capacitated only when it
/// starts with decimal digits followed by at least one more character;
/// anything else is explicitly uncapacitated (None), never a sentinel.
pub fn parse_capacity(fiber_name: &str) -> Option<u32> {
    let name = fiber_name.trim();
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() == name.len() {
        return None;
    }
    digits.parse().ok()
}

/// Numeric-aware lexical comparison of fiber names, so "2_link" sorts
/// before "10_link". Digit runs compare as integers, everything else
/// byte-wise.
pub fn compare_fiber_names(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                } else {
                    ai.next();
                    bi.next();
                    match ca.cmp(&cb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u64 {
    let mut n: u64 = 0;
    while let Some(&c) = it.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        n = n.saturating_mul(10).saturating_add(c as u64 - '0' as u64);
        it.next();
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity("48_trunk_1"), Some(48));
        assert_eq!(parse_capacity("4_link"), Some(4));
        assert_eq!(parse_capacity("trunk_48"), None);
        assert_eq!(parse_capacity(""), None);
        assert_eq!(parse_capacity("  12-ring  "), Some(12));
    }

    #[test]
    fn test_parse_capacity_bare_number_is_uncapacitated() {
        // A bare number has no separator, so it is not a capacity prefix
        assert_eq!(parse_capacity("48"), None);
    }

    #[test]
    fn test_compare_fiber_names_numeric_aware() {
        assert_eq!(compare_fiber_names("2_link", "10_link"), Ordering::Less);
        assert_eq!(compare_fiber_names("48_a", "48_b"), Ordering::Less);
        assert_eq!(compare_fiber_names("trunk_2", "trunk_10"), Ordering::Less);
        assert_eq!(compare_fiber_names("same", "same"), Ordering::Equal);
        assert_eq!(compare_fiber_names("a10", "a2b"), Ordering::Greater);
    }
}
