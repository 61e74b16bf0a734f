//! Phone number normalization for the mobile-money channel.

/// Country prefix every push target must carry.
pub const COUNTRY_PREFIX: &str = "254";

/// Normalizes a raw phone input into the provider's expected MSISDN form.
///
/// Accepts already-prefixed numbers (`254712345678`), leading-zero local
/// numbers (`0712345678`) and bare 9-digit local numbers (`712345678`),
/// with optional `+`, whitespace and separator characters. Anything else is
/// returned cleaned but unchanged; callers must validate the result with
/// [`is_valid_msisdn`] before use.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    let no_plus = digits.strip_prefix('+').unwrap_or(&digits);

    if is_valid_msisdn(no_plus) {
        return no_plus.to_string();
    }
    if no_plus.len() == 10 && no_plus.starts_with('0') && all_digits(no_plus) {
        return format!("{COUNTRY_PREFIX}{}", &no_plus[1..]);
    }
    if no_plus.len() == 9 && all_digits(no_plus) {
        return format!("{COUNTRY_PREFIX}{no_plus}");
    }

    no_plus.to_string()
}

/// Returns true if the value is a full MSISDN: the country prefix followed by
/// nine digits.
pub fn is_valid_msisdn(phone: &str) -> bool {
    phone.len() == 12 && phone.starts_with(COUNTRY_PREFIX) && all_digits(phone)
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_number_passes_through() {
        assert_eq!(normalize_phone("254712345678"), "254712345678");
    }

    #[test]
    fn test_leading_zero_number_is_prefixed() {
        assert_eq!(normalize_phone("0712345678"), "254712345678");
    }

    #[test]
    fn test_bare_local_number_is_prefixed() {
        assert_eq!(normalize_phone("712345678"), "254712345678");
    }

    #[test]
    fn test_plus_and_separators_are_stripped() {
        assert_eq!(normalize_phone("+254 712 345 678"), "254712345678");
        assert_eq!(normalize_phone("0712-345-678"), "254712345678");
        assert_eq!(normalize_phone(" 07 12 34 56 78 "), "254712345678");
    }

    #[test]
    fn test_unrecognized_shapes_returned_unchanged() {
        assert_eq!(normalize_phone("12345"), "12345");
        assert_eq!(normalize_phone("44712345678"), "44712345678");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_is_valid_msisdn() {
        assert!(is_valid_msisdn("254712345678"));
        assert!(!is_valid_msisdn("0712345678"));
        assert!(!is_valid_msisdn("25471234567"));
        assert!(!is_valid_msisdn("2547123456789"));
        assert!(!is_valid_msisdn("25471234567a"));
    }
}
