//! # Money Formatting
//!
//! Display helpers for Brazilian real amounts.
//!
//! ## Why Only Formatting?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Calculations  →  f64, unrounded (pricing / totals)                     │
//! │  Persistence   →  f64 inside calculated_json / totals_json              │
//! │  Display       →  THIS MODULE: rounded to centavos, pt-BR separators    │
//! │                                                                         │
//! │  113        → "R$ 113,00"                                               │
//! │  1234.5     → "R$ 1.234,50"                                             │
//! │  -5         → "-R$ 5,00"                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The space after `R$` is a non-breaking space (U+00A0), matching what
//! browsers render for pt-BR currency. Non-finite amounts render the way
//! browsers do too: `R$ NaN`, `R$ ∞` and `-R$ ∞`.

/// Currency prefix, including the non-breaking space.
pub const BRL_PREFIX: &str = "R$\u{a0}";

/// Rounds an amount to whole centavos (half away from zero).
///
/// ## Example
/// ```rust
/// use studio_core::money::to_centavos;
///
/// assert_eq!(to_centavos(10.999), 1100);
/// assert_eq!(to_centavos(-5.5), -550);
/// ```
pub fn to_centavos(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Formats an amount as Brazilian reais.
///
/// ## Example
/// ```rust
/// use studio_core::money::format_brl;
///
/// assert_eq!(format_brl(1234.56), "R$\u{a0}1.234,56");
/// assert_eq!(format_brl(-5.0), "-R$\u{a0}5,00");
/// assert_eq!(format_brl(f64::NEG_INFINITY), "-R$\u{a0}∞");
/// ```
pub fn format_brl(value: f64) -> String {
    if let Some(text) = non_finite(value) {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{BRL_PREFIX}{text}");
    }

    let centavos = to_centavos(value);
    let sign = if centavos < 0 { "-" } else { "" };
    let abs = centavos.unsigned_abs();
    let reais = abs / 100;
    let cents = abs % 100;

    format!("{sign}{BRL_PREFIX}{},{cents:02}", group_thousands(reais))
}

/// Formats a percentage with one decimal place, pt-BR style (`42,7%`).
pub fn format_percent(value: f64) -> String {
    if let Some(text) = non_finite(value) {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}{text}%");
    }

    let tenths = (value * 10.0).round() as i64;
    let sign = if tenths < 0 { "-" } else { "" };
    let abs = tenths.unsigned_abs();
    format!("{sign}{},{}%", abs / 10, abs % 10)
}

fn non_finite(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value.is_infinite() {
        Some("∞")
    } else {
        None
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(113.0), "R$\u{a0}113,00");
        assert_eq!(format_brl(0.0), "R$\u{a0}0,00");
        assert_eq!(format_brl(1234.5), "R$\u{a0}1.234,50");
        assert_eq!(format_brl(1_234_567.891), "R$\u{a0}1.234.567,89");
        assert_eq!(format_brl(-5.0), "-R$\u{a0}5,00");
    }

    #[test]
    fn test_format_brl_rounds_to_centavos() {
        assert_eq!(format_brl(64.745_1), "R$\u{a0}64,75");
        assert_eq!(format_brl(0.004), "R$\u{a0}0,00");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_brl(f64::NAN), "R$\u{a0}NaN");
        assert_eq!(format_brl(f64::INFINITY), "R$\u{a0}∞");
        assert_eq!(format_brl(f64::NEG_INFINITY), "-R$\u{a0}∞");

        assert_eq!(format_percent(f64::NAN), "NaN%");
        assert_eq!(format_percent(f64::INFINITY), "∞%");
        assert_eq!(format_percent(f64::NEG_INFINITY), "-∞%");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(42.699), "42,7%");
        assert_eq!(format_percent(0.0), "0,0%");
        assert_eq!(format_percent(-12.34), "-12,3%");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1.000");
        assert_eq!(group_thousands(12_345_678), "12.345.678");
    }
}
