//! Locale-flexible number parsing for imported food tables
//!
//! Composition tables use a decimal comma, mark trace amounts with "Tr" and
//! leave unmeasured cells as "-" or blank.

/// Parse a nutrient cell
///
/// Examples:
/// - "1,5" -> Some(1.5)
/// - "Tr" -> Some(0.0)
/// - "-", "", "NaN", "none" -> None
/// - "abc" -> None
pub fn parse_nutrient(text: &str) -> Option<f64> {
    let s = text.trim();
    let lower = s.to_lowercase();

    if s.is_empty() || s == "-" || lower == "nan" || lower == "none" {
        return None;
    }
    if lower == "tr" {
        return Some(0.0);
    }

    s.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
