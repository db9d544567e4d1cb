//! Phone number normalization used to correlate contacts.

/// Strips everything except digits and a single leading `+`.
///
/// A `+` survives only as the first character of the result, which keeps the
/// function idempotent: `normalize_phone(&normalize_phone(x)) == normalize_phone(x)`.
pub fn normalize_phone(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' && out.is_empty() {
            out.push(c);
        }
    }
    out
}

/// Returns true if `candidate` matches the normalized `key`.
///
/// A candidate matches when its normalized form contains the key and is at
/// least as long, so `+573001234567` matches a key of `3001234567`.
pub fn phone_matches(candidate: &str, key: &str) -> bool {
    let key = normalize_phone(key);
    if key.is_empty() {
        return false;
    }
    let candidate = normalize_phone(candidate);
    candidate.len() >= key.len() && candidate.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(normalize_phone("+57 (300) 123-4567"), "+573001234567");
        assert_eq!(normalize_phone("300.123.4567"), "3001234567");
        assert_eq!(normalize_phone(""), "");
        assert_eq!(normalize_phone("ext"), "");
    }

    #[test]
    fn only_leading_plus_survives() {
        assert_eq!(normalize_phone("1+2"), "12");
        assert_eq!(normalize_phone("++1"), "+1");
        assert_eq!(normalize_phone(" +1 +2"), "+12");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "+57 300 123 4567",
            "++--++",
            "1+2+3",
            "(555) 010-9999 ext. 12",
            "+",
            "ünïcödé +٣ 12",
            "",
        ];
        for sample in samples {
            let once = normalize_phone(sample);
            assert_eq!(normalize_phone(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn containment_match() {
        assert!(phone_matches("+57 300 123 4567", "3001234567"));
        assert!(phone_matches("3001234567", "300-123-4567"));
        assert!(!phone_matches("1234567", "3001234567"));
        assert!(!phone_matches("3001234567", ""));
    }
}
