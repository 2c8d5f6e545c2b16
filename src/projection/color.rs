//! Hex color parsing

use serde::{Deserialize, Serialize};

/// RGB channels, 0-255 each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Parse a 3- or 6-digit hex color, with or without a leading `#`.
///
/// Returns `None` for any other length or for non-hex digits; callers emit
/// `rgb: null` in that case.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();

    Some(Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_digit_hex() {
        assert_eq!(
            hex_to_rgb("#ffffff"),
            Some(Rgb { r: 255, g: 255, b: 255 })
        );
        assert_eq!(hex_to_rgb("1e90ff"), Some(Rgb { r: 30, g: 144, b: 255 }));
    }

    #[test]
    fn test_three_digit_hex() {
        assert_eq!(hex_to_rgb("#f00"), Some(Rgb { r: 255, g: 0, b: 0 }));
        assert_eq!(hex_to_rgb("abc"), Some(Rgb { r: 170, g: 187, b: 204 }));
    }

    #[test]
    fn test_malformed_hex() {
        assert_eq!(hex_to_rgb("#gggggg"), None);
        assert_eq!(hex_to_rgb("#ffff"), None);
        assert_eq!(hex_to_rgb(""), None);
        assert_eq!(hex_to_rgb("#ééé"), None);
    }
}
