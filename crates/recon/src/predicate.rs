use chrono::Datelike;

use concilia_core::{text, Record};

/// Extra admission checks layered onto the pairwise matching passes. All
/// installed filters must accept a candidate pair; the generic passes stay
/// unaware of which reconciliation variant supplied them.
pub trait PairFilter: Send + Sync {
    fn accept(&self, statement: &Record, ledger: &Record) -> bool;
}

/// A payment cannot settle a retention recorded after it: the ledger-side
/// date must be on or after the statement-side date. Dateless candidates are
/// let through, the report surfaces them for review either way.
pub struct PaidOnOrAfter;

impl PairFilter for PaidOnOrAfter {
    fn accept(&self, statement: &Record, ledger: &Record) -> bool {
        match (statement.date, ledger.date) {
            (Some(s), Some(l)) => l >= s,
            _ => true,
        }
    }
}

/// When the ledger narrative names calendar months ("FOLHA MARÇO/2024"),
/// one of them must be the statement record's month. Narratives naming no
/// month pass vacuously.
pub struct MonthMentionCompatible;

impl PairFilter for MonthMentionCompatible {
    fn accept(&self, statement: &Record, ledger: &Record) -> bool {
        let Some(date) = statement.date else {
            return true;
        };
        let mentioned = text::mentioned_months(&ledger.description);
        mentioned.is_empty() || mentioned.contains(&date.month())
    }
}
