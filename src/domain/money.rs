use std::fmt;

/// Money is an integer count of the currency's minor unit (1 rupiah = 100 sen,
/// so Rp 20.000 is stored as 2_000_000). Never a float.
pub type Amount = i64;

/// Render an amount with thousands separators and two decimals.
/// Example: 2_000_000 -> "20,000.00", -125 -> "-1.25"
pub fn format_amount(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let units = (abs / 100).to_string();
    let fraction = abs % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{:02}", sign, grouped, fraction)
}

/// Parse a human-entered amount into minor units.
/// Accepts "100000", "100,000", "1,250.75", "12.5", "-30000".
/// More than two decimal places is rejected rather than silently truncated.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    let whole: String = whole.chars().filter(|c| *c != ',').collect();
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }
    if fraction.len() > 2 {
        return Err(ParseAmountError::TooPrecise);
    }
    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };
    let minor: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().map_err(|_| ParseAmountError::InvalidFormat)? * 10,
        _ => fraction.parse().map_err(|_| ParseAmountError::InvalidFormat)?,
    };

    let amount = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(minor))
        .ok_or(ParseAmountError::Overflow)?;

    Ok(if negative { -amount } else { amount })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
    TooPrecise,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::TooPrecise => write!(f, "at most two decimal places are allowed"),
            ParseAmountError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(100_000), "1,000.00");
        assert_eq!(format_amount(10_000_000), "100,000.00");
        assert_eq!(format_amount(123_456_789), "1,234,567.89");
        assert_eq!(format_amount(-2_000_000), "-20,000.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100000"), Ok(10_000_000));
        assert_eq!(parse_amount("100,000"), Ok(10_000_000));
        assert_eq!(parse_amount("1,250.75"), Ok(125_075));
        assert_eq!(parse_amount("12.5"), Ok(1250));
        assert_eq!(parse_amount(".50"), Ok(50));
        assert_eq!(parse_amount("-30000"), Ok(-3_000_000));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert_eq!(parse_amount("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("1.2.3"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("10.999"), Err(ParseAmountError::TooPrecise));
        assert_eq!(parse_amount("."), Err(ParseAmountError::InvalidFormat));
    }

    #[test]
    fn test_parse_then_format() {
        let amount = parse_amount("1,250.75").unwrap();
        assert_eq!(format_amount(amount), "1,250.75");
    }
}
