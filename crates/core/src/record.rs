use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::text;

/// Which of the two reconciliation inputs a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Statement,
    Ledger,
}

/// Pseudo-document assigned to the daily aggregate of bank fee lines.
pub const DOC_FEES: &str = "Tarifas Bancárias";
/// Written on value-only matches so the reviewer knows the codes disagreed.
pub const DOC_MISMATCH: &str = "Docs dif.";
/// Ledger rows on a date with no statement documents to borrow from.
pub const DOC_UNKNOWN: &str = "S/D";
/// Ledger rows whose narrative mentions no known statement document.
pub const DOC_NOT_FOUND: &str = "NÃO LOCALIZADO";

/// One normalized transaction on either side of a reconciliation.
///
/// A record's identity is its index in its side's input collection; the
/// matcher tracks consumption against those indices and never mutates or
/// reorders the collections themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Day-resolution date. `None` only for ledger rows whose date failed to
    /// parse, kept when the wildcard matching mode is in use.
    pub date: Option<NaiveDate>,
    /// Free-text narrative; display and classifier input, never a join key.
    pub description: String,
    /// Contract/commitment/payment-order code; possibly empty or synthetic.
    pub document: String,
    pub amount: Money,
    pub side: Side,
}

impl Record {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        document: impl Into<String>,
        amount: Money,
        side: Side,
    ) -> Self {
        Record {
            date: Some(date),
            description: description.into(),
            document: document.into(),
            amount,
            side,
        }
    }
}

/// How document codes are compared between the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocPolicy {
    /// Byte-for-byte string equality.
    Literal,
    /// Digit equality with leading zeros trimmed, so "001234" == "1234".
    /// Codes without digits fall back to literal comparison.
    #[default]
    NumericLenient,
}

impl DocPolicy {
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            DocPolicy::Literal => a == b,
            DocPolicy::NumericLenient => {
                let da = text::digits(a);
                let db = text::digits(b);
                if da.is_empty() || db.is_empty() {
                    a == b
                } else {
                    da.trim_start_matches('0') == db.trim_start_matches('0')
                }
            }
        }
    }
}
