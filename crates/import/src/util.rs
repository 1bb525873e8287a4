use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use concilia_core::Money;

/// Parse a Brazilian-formatted currency cell: `1.234,56`. Cells exported as
/// plain decimals (`1234.56`) are accepted too; anything else is `None` and
/// the row it came from gets dropped upstream.
pub fn parse_br_amount(raw: &str) -> Option<Money> {
    let s = raw.trim().replace("R$", "").replace(' ', "");
    if s.is_empty() {
        return None;
    }
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s
    };
    Decimal::from_str(&normalized).ok().map(Money::from_decimal)
}

/// Day-first date parsing. Cells may carry a time suffix (`01/02/2024 00:00`)
/// which is cut at the first whitespace; `dd/mm` dates are completed with
/// `assumed_year` when one is given.
pub fn parse_br_date(raw: &str, assumed_year: Option<i32>) -> Option<NaiveDate> {
    let s = raw.trim().split_whitespace().next()?;

    for fmt in ["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    if let Some(year) = assumed_year {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}/{year}"), "%d/%m/%Y") {
            return Some(date);
        }
    }
    None
}

/// Undo the `.0` float artifact spreadsheet exports stamp on numeric cells.
pub fn clean_cell_number(raw: &str) -> String {
    let s = raw.trim();
    s.strip_suffix(".0").unwrap_or(s).to_string()
}
