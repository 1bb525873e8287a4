//! Text normalization shared by the import classifiers and the
//! month-compatibility matching predicate. Narratives come from bank PDFs and
//! ledger exports with inconsistent casing and accents, so every substring
//! classifier works on the accent-stripped upper-case form.

/// Upper-case Portuguese month names, accent-stripped (MARCO, not MARÇO),
/// indexed by month number - 1.
pub const MONTHS: [&str; 12] = [
    "JANEIRO", "FEVEREIRO", "MARCO", "ABRIL", "MAIO", "JUNHO", "JULHO", "AGOSTO", "SETEMBRO",
    "OUTUBRO", "NOVEMBRO", "DEZEMBRO",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    (month as usize)
        .checked_sub(1)
        .and_then(|i| MONTHS.get(i))
        .copied()
}

/// Month numbers whose Portuguese name appears in the text.
pub fn mentioned_months(text: &str) -> Vec<u32> {
    let norm = normalize_upper(text);
    MONTHS
        .iter()
        .enumerate()
        .filter(|(_, name)| norm.contains(*name))
        .map(|(i, _)| i as u32 + 1)
        .collect()
}

/// Accent-stripped upper-case form used by all substring classifiers.
pub fn normalize_upper(text: &str) -> String {
    text.chars().map(fold_accent).collect::<String>().to_uppercase()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Only the ASCII digits of a string.
pub fn digits(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Canonical form of a document code scraped from a narrative: digits only,
/// truncated to the final six (bank layouts prefix agency/lot digits).
pub fn clean_document(raw: &str) -> String {
    let d = digits(raw);
    if d.len() > 6 {
        d[d.len() - 6..].to_string()
    } else {
        d
    }
}
