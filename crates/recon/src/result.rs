use chrono::NaiveDate;
use serde::Serialize;

use concilia_core::{Money, Record};

/// Which pass of the matcher produced a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTier {
    /// Date + document + amount.
    Exact,
    /// Date + amount, document codes disagreed.
    ValueOnly,
    /// Residue aggregated by (date, document) summed to agreement.
    Grouped,
}

/// A one-to-one pairing found by tier 1 or 2.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedPair {
    pub statement: Record,
    pub ledger: Record,
    pub tier: MatchTier,
    /// Document shown on the report row: the statement code for exact
    /// matches, the mismatch sentinel for value-only ones.
    pub document: String,
    /// Within tolerance of zero by construction.
    pub difference: Money,
}

/// A record no pass could pair, kept with its index in the input collection
/// so the report can point back at the source line.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualRecord {
    pub index: usize,
    pub record: Record,
}

/// Outer-join aggregation of residue sharing one (date, document) key.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedRow {
    pub date: Option<NaiveDate>,
    pub document: String,
    /// Narrative of the first statement member, or "S/H" for ledger-only groups.
    pub description: String,
    pub statement_total: Money,
    pub ledger_total: Money,
    /// statement_total − ledger_total.
    pub difference: Money,
    /// Input-collection indices of the records summed on each side.
    pub statement_members: Vec<usize>,
    pub ledger_members: Vec<usize>,
    /// Difference within tolerance: the many-to-many residue reconciled.
    pub balanced: bool,
}

/// Complete outcome of one reconciliation run. Every input record appears in
/// exactly one of `matched` (as one half of a pair) or its side's residue;
/// `grouped` is a view over the residue, not a third bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    pub matched: Vec<MatchedPair>,
    pub statement_residue: Vec<ResidualRecord>,
    pub ledger_residue: Vec<ResidualRecord>,
    pub grouped: Vec<GroupedRow>,
}

impl Reconciliation {
    pub fn matched_statement_total(&self) -> Money {
        self.matched.iter().map(|p| p.statement.amount).sum()
    }

    pub fn matched_ledger_total(&self) -> Money {
        self.matched.iter().map(|p| p.ledger.amount).sum()
    }

    pub fn statement_residue_total(&self) -> Money {
        self.statement_residue.iter().map(|r| r.record.amount).sum()
    }

    pub fn ledger_residue_total(&self) -> Money {
        self.ledger_residue.iter().map(|r| r.record.amount).sum()
    }

    /// True when nothing is left unexplained: no pairless residue outside
    /// balanced groups.
    pub fn is_settled(&self) -> bool {
        self.grouped.iter().all(|g| g.balanced)
    }
}
