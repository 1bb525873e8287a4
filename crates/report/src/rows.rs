use chrono::NaiveDate;
use serde::Serialize;

use concilia_core::Money;
use concilia_recon::{group_and_sum, MatchTier, Reconciliation};

/// Distinguishes data rows from the summary rows interleaved with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowKind {
    Detail,
    Subtotal,
    GrandTotal,
}

/// One renderable line of the reconciliation report. Amounts stay numeric
/// here; formatting (Brazilian separators, dashes for clean differences) is
/// the renderer's business.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub kind: RowKind,
    pub date: Option<NaiveDate>,
    pub document: String,
    pub description: String,
    pub statement_amount: Money,
    pub ledger_amount: Money,
    pub difference: Money,
    pub status: String,
}

/// Status vocabulary. The engine is shared between reconciliation variants
/// whose reviewers read different words for the same buckets, so the labels
/// travel with the report options rather than the result.
#[derive(Debug, Clone, Serialize)]
pub struct StatusLabels {
    pub matched: String,
    pub document_mismatch: String,
    pub grouped: String,
    pub statement_only: String,
    pub ledger_only: String,
    pub divergent: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        StatusLabels {
            matched: "Conciliado".to_string(),
            document_mismatch: "Docs dif.".to_string(),
            grouped: "Agrupado".to_string(),
            statement_only: "Só no Extrato".to_string(),
            ledger_only: "Só no Razão".to_string(),
            divergent: "Divergente".to_string(),
        }
    }
}

impl StatusLabels {
    /// Vocabulary of the retention reconciliation pages.
    pub fn retention() -> Self {
        StatusLabels {
            statement_only: "Retido s/ Pagto".to_string(),
            ledger_only: "Pago s/ Retenção".to_string(),
            ..StatusLabels::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Insert one subtotal row per calendar day.
    pub daily_subtotals: bool,
    pub labels: StatusLabels,
}

/// Flatten a reconciliation into ordered report rows: detail rows sorted by
/// (date, document), optional per-day subtotals, one grand total.
pub fn build_rows(outcome: &Reconciliation, options: &ReportOptions) -> Vec<ReportRow> {
    let labels = &options.labels;
    let mut details: Vec<ReportRow> = Vec::new();

    for pair in &outcome.matched {
        details.push(ReportRow {
            kind: RowKind::Detail,
            date: pair.statement.date,
            document: pair.document.clone(),
            description: pair.statement.description.clone(),
            statement_amount: pair.statement.amount,
            ledger_amount: pair.ledger.amount,
            difference: pair.difference,
            status: match pair.tier {
                MatchTier::ValueOnly => labels.document_mismatch.clone(),
                _ => labels.matched.clone(),
            },
        });
    }

    for group in &outcome.grouped {
        let status = if group.balanced {
            &labels.grouped
        } else if group.ledger_members.is_empty() {
            &labels.statement_only
        } else if group.statement_members.is_empty() {
            &labels.ledger_only
        } else {
            &labels.divergent
        };
        details.push(ReportRow {
            kind: RowKind::Detail,
            date: group.date,
            document: group.document.clone(),
            description: group.description.clone(),
            statement_amount: group.statement_total,
            ledger_amount: group.ledger_total,
            difference: group.difference,
            status: status.clone(),
        });
    }

    details.sort_by(|a, b| (a.date, &a.document).cmp(&(b.date, &b.document)));

    let mut rows = Vec::with_capacity(details.len() + 2);
    if options.daily_subtotals {
        // The same aggregation the matcher's grouped pass uses, keyed by day.
        for day in group_and_sum(&details, |r| r.date, |r| r.difference) {
            let members: Vec<&ReportRow> = day.members.iter().map(|&i| &details[i]).collect();
            rows.extend(members.iter().map(|r| (*r).clone()));
            rows.push(ReportRow {
                kind: RowKind::Subtotal,
                date: day.key,
                document: String::new(),
                description: "Subtotal do dia".to_string(),
                statement_amount: members.iter().map(|r| r.statement_amount).sum(),
                ledger_amount: members.iter().map(|r| r.ledger_amount).sum(),
                difference: day.total,
                status: String::new(),
            });
        }
    } else {
        rows.extend(details.iter().cloned());
    }

    let (statement_total, ledger_total, difference_total) = rows
        .iter()
        .filter(|r| r.kind == RowKind::Detail)
        .fold(
            (Money::zero(), Money::zero(), Money::zero()),
            |(s, l, d), r| (s + r.statement_amount, l + r.ledger_amount, d + r.difference),
        );
    rows.push(ReportRow {
        kind: RowKind::GrandTotal,
        date: None,
        document: String::new(),
        description: "TOTAL".to_string(),
        statement_amount: statement_total,
        ledger_amount: ledger_total,
        difference: difference_total,
        status: String::new(),
    });
    rows
}
