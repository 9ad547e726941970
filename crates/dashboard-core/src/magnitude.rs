use crate::DashboardError;

/// Parse an abbreviated magnitude string ("2.5T", "340.15B", "7.0M") into an
/// exact integer count.
///
/// The scaling is done on the digit string itself rather than by multiplying
/// a float by a power of ten, so the result is exact for every input the
/// suffix width can represent: the decimal point is removed and the digits
/// are right-padded with zeros up to the suffix exponent (T = 10^12,
/// B = 10^9, M = 10^6).
pub fn normalize_magnitude(s: &str) -> Result<i64, DashboardError> {
    let mut chars = s.chars();
    let suffix = chars
        .next_back()
        .ok_or_else(|| DashboardError::Format("empty string".to_string()))?;

    // Suffix width counts the digits of the fully written-out value of
    // "1.0<suffix>": 15 for T, 12 for B, 9 for M. The exponent is width - 3.
    let width: usize = match suffix {
        'T' => 15,
        'B' => 12,
        'M' => 9,
        _ => {
            return Err(DashboardError::Format(format!(
                "no recognized suffix in {s:?}"
            )))
        }
    };
    let exponent = width - 3;

    // The mantissa must carry exactly one decimal point; "7M" is as
    // malformed as "2.5" with no suffix.
    let mantissa = chars.as_str();
    let (int_part, frac_part) = mantissa.split_once('.').ok_or_else(|| {
        DashboardError::Format(format!("no decimal point in {s:?}"))
    })?;

    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(DashboardError::Format(format!(
            "non-digit characters in {s:?}"
        )));
    }

    // More fractional digits than the exponent, or more total digits than
    // the width, cannot be represented by padding. Refuse rather than
    // truncate.
    if frac_part.len() > exponent || int_part.len() + frac_part.len() > width {
        return Err(DashboardError::Format(format!(
            "{s:?} has more significant digits than the {suffix} suffix supports"
        )));
    }

    let mut digits = String::with_capacity(int_part.len() + exponent);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in 0..exponent - frac_part.len() {
        digits.push('0');
    }

    digits
        .parse::<i64>()
        .map_err(|_| DashboardError::Format(format!("{s:?} out of integer range")))
}

/// Comma-separated display form of an integer amount, e.g. 2500000 -> "2,500,000".
pub fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trillions() {
        assert_eq!(normalize_magnitude("2.5T").unwrap(), 2_500_000_000_000);
        assert_eq!(normalize_magnitude("1.82T").unwrap(), 1_820_000_000_000);
    }

    #[test]
    fn test_normalize_billions() {
        assert_eq!(normalize_magnitude("340.15B").unwrap(), 340_150_000_000);
        assert_eq!(normalize_magnitude("1.0B").unwrap(), 1_000_000_000);
    }

    #[test]
    fn test_normalize_millions() {
        assert_eq!(normalize_magnitude("12.3M").unwrap(), 12_300_000);
    }

    #[test]
    fn test_missing_decimal_point_is_format_error() {
        assert!(matches!(
            normalize_magnitude("7M"),
            Err(DashboardError::Format(_))
        ));
        assert!(matches!(
            normalize_magnitude("7B"),
            Err(DashboardError::Format(_))
        ));
        assert_eq!(normalize_magnitude("7.0M").unwrap(), 7_000_000);
    }

    #[test]
    fn test_exact_at_full_precision() {
        // Every digit of the mantissa survives into the result.
        assert_eq!(
            normalize_magnitude("999.999999999999T").unwrap(),
            999_999_999_999_999
        );
    }

    #[test]
    fn test_no_suffix_is_format_error() {
        assert!(matches!(
            normalize_magnitude("2.5"),
            Err(DashboardError::Format(_))
        ));
    }

    #[test]
    fn test_non_digit_mantissa_is_format_error() {
        assert!(matches!(
            normalize_magnitude("abcT"),
            Err(DashboardError::Format(_))
        ));
        assert!(matches!(
            normalize_magnitude("1.2.3B"),
            Err(DashboardError::Format(_))
        ));
    }

    #[test]
    fn test_empty_inputs_are_format_errors() {
        assert!(matches!(
            normalize_magnitude(""),
            Err(DashboardError::Format(_))
        ));
        assert!(matches!(
            normalize_magnitude(".5T"),
            Err(DashboardError::Format(_))
        ));
        assert!(matches!(
            normalize_magnitude("T"),
            Err(DashboardError::Format(_))
        ));
    }

    #[test]
    fn test_too_many_digits_is_format_error_not_truncation() {
        // 7 fractional digits cannot be padded into the M exponent of 6.
        assert!(matches!(
            normalize_magnitude("1.2345678M"),
            Err(DashboardError::Format(_))
        ));
        // 16 significant digits exceed the T width of 15.
        assert!(matches!(
            normalize_magnitude("1234.567890123456T"),
            Err(DashboardError::Format(_))
        ));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(950), "950");
        assert_eq!(format_thousands(2_500_000), "2,500,000");
        assert_eq!(format_thousands(1_820_000_000_000), "1,820,000,000,000");
        assert_eq!(format_thousands(-45_000), "-45,000");
    }
}
