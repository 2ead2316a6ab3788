use chrono::NaiveDate;

/// Format an amount as Brazilian reais for display: `R$ 1234.50`
pub fn format_currency(amount: f64) -> String {
    format!("R$ {:.2}", amount)
}

/// Format a ratio (0.25) as a percentage with one decimal: `25.0%`
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format a phone number for display
/// Normalizes Brazilian numbers to (XX) XXXXX-XXXX or (XX) XXXX-XXXX
pub fn format_phone(phone: &str) -> String {
    // Extract just the digits
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = if digits.len() > 11 && digits.starts_with("55") {
        &digits[2..]
    } else {
        digits.as_str()
    };

    match digits.len() {
        11 => format!("({}) {}-{}", &digits[0..2], &digits[2..7], &digits[7..11]),
        10 => format!("({}) {}-{}", &digits[0..2], &digits[2..6], &digits[6..10]),
        _ => phone.to_string(), // Return original if can't format
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a YYYY-MM-DD date as DD/MM/YYYY; anything unparseable is returned as-is
pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%d/%m/%Y").to_string(),
        Err(_) => date.to_string(),
    }
}
