//! Shared utilities for dashboard views

use ratatui::style::Color;

/// Truncate a string to max_len characters, ending in "…" if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    match max_len {
        0 => String::new(),
        _ => {
            let kept: String = s.chars().take(max_len - 1).collect();
            format!("{}…", kept)
        }
    }
}

/// Parses a `#rrggbb` task color
pub fn parse_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate_str("Press", 10), "Press");
        assert_eq!(truncate_str("Press", 5), "Press");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate_str("Injection molder", 8), "Injecti…");
        assert_eq!(truncate_str("Oven", 1), "…");
        assert_eq!(truncate_str("Oven", 0), "");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_str("Fräse", 5), "Fräse");
        assert_eq!(truncate_str("Fräsmaschine", 4), "Frä…");
    }

    #[test]
    fn task_colors() {
        assert_eq!(parse_color("#3b82f6"), Some(Color::Rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(parse_color("#FFFFFF"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(parse_color("3b82f6"), None);
        assert_eq!(parse_color("#3b82"), None);
        assert_eq!(parse_color("#zz82f6"), None);
    }
}
