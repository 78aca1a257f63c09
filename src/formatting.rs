use crate::types::ValueKind;

/// Renders a raw sample value for display.
///
/// Percentages are ratios in `[0, 1]` scaled by 100 with two decimals;
/// integers are counts rounded to the nearest whole number.
pub fn format_value(raw: f64, kind: ValueKind) -> String {
    match kind {
        ValueKind::Percentage => format!("{}%", unsigned_zero(format!("{:.2}", raw * 100.0))),
        ValueKind::Integer => unsigned_zero(format!("{:.0}", raw)),
    }
}

// Negative values that round to zero print as "-0.00"; drop the sign.
fn unsigned_zero(text: String) -> String {
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_value(0.6734, ValueKind::Percentage), "67.34%");
        assert_eq!(format_value(0.0, ValueKind::Percentage), "0.00%");
        assert_eq!(format_value(1.0, ValueKind::Percentage), "100.00%");
        assert_eq!(format_value(1.5, ValueKind::Percentage), "150.00%");
        assert_eq!(format_value(-0.0, ValueKind::Percentage), "0.00%");
        assert_eq!(format_value(-0.00001, ValueKind::Percentage), "0.00%");
    }

    #[test]
    fn test_format_integer() {
        assert_eq!(format_value(3.0, ValueKind::Integer), "3");
        assert_eq!(format_value(0.0, ValueKind::Integer), "0");
        assert_eq!(format_value(41.6, ValueKind::Integer), "42");
        assert_eq!(format_value(1024.0, ValueKind::Integer), "1024");
        assert_eq!(format_value(-0.2, ValueKind::Integer), "0");
    }
}
