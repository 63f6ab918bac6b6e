//! Address normalization helpers shared by definitions, dumps and comparison

/// Lower-case an address (or any dump key) into its canonical join form
pub fn canonical_address(address: &str) -> String {
    address.to_lowercase()
}

/// Parse a hexadecimal integer, defaulting to zero on failure
///
/// Accepts an optional `0x`/`0X` prefix and ignores surrounding whitespace.
/// Empty, non-hex, or out-of-range input yields `0` instead of an error.
pub fn parse_hex_or_zero(input: &str) -> u64 {
    let trimmed = input.trim();
    let digits = strip_hex_prefix(trimmed).unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).unwrap_or(0)
}

/// Render an address as `0x` followed by uppercase hex digits
pub fn format_address(value: u64) -> String {
    format!("0x{:X}", value)
}

/// Check that an address is `0x` followed by one or more hex digits
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Ensure a user-entered address carries a hex prefix
pub fn with_hex_prefix(address: &str) -> String {
    let trimmed = address.trim();
    if strip_hex_prefix(trimmed).is_some() {
        trimmed.to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_address() {
        assert_eq!(canonical_address("0X1A"), "0x1a");
        assert_eq!(canonical_address("CTRL"), "ctrl");
    }

    #[test]
    fn test_parse_hex_or_zero() {
        assert_eq!(parse_hex_or_zero("0x10"), 16);
        assert_eq!(parse_hex_or_zero("0XfF"), 255);
        assert_eq!(parse_hex_or_zero("  1000 "), 0x1000);
        assert_eq!(parse_hex_or_zero("bogus"), 0);
        assert_eq!(parse_hex_or_zero("10zz"), 0);
        assert_eq!(parse_hex_or_zero(""), 0);
        assert_eq!(parse_hex_or_zero("0x"), 0);
        // Wider than u64
        assert_eq!(parse_hex_or_zero("0x10000000000000000"), 0);
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0), "0x0");
        assert_eq!(format_address(10), "0xA");
        assert_eq!(format_address(0x4000_00ff), "0x400000FF");
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0x1000"));
        assert!(is_valid_address("0xdeadBEEF"));
        assert!(!is_valid_address("0x"));
        assert!(!is_valid_address("1000"));
        assert!(!is_valid_address("0x10g"));
    }

    #[test]
    fn test_with_hex_prefix() {
        assert_eq!(with_hex_prefix("1000"), "0x1000");
        assert_eq!(with_hex_prefix(" 0x20 "), "0x20");
        assert_eq!(with_hex_prefix("0XAB"), "0XAB");
    }
}
