use serde::{Deserialize, Serialize};

use concilia_core::{text, Money, Record, Side};

use crate::ledger::LedgerRow;

/// Classifiers for splitting one ledger export into the two sides of a
/// retention reconciliation. All matching is accent-stripped substring
/// containment on the row's kind (or history, for payment reversals).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetentionProfile {
    /// Kind of retention rows; credits are retentions, debits reverse them.
    pub retention_kind: String,
    /// Kind of the payments that settle retentions (always debits).
    pub payment_kind: String,
    /// Credited rows mentioning this in kind or history reverse a payment.
    pub reversal_marker: String,
}

impl Default for RetentionProfile {
    fn default() -> Self {
        RetentionProfile {
            retention_kind: "Retenção Empenho".to_string(),
            payment_kind: "Pagamento de Documento Extra".to_string(),
            reversal_marker: "Estorno".to_string(),
        }
    }
}

/// Build the (retentions, payments) record pair for the matcher. Reversal
/// rows cancel their originals first, so neither side ever sees a
/// retention/payment that was undone in the same export. Retentions take the
/// statement side by convention: they are what the reconciliation is *for*,
/// and their residue is the "retained without payment" bucket.
pub fn split_retentions(
    rows: &[LedgerRow],
    profile: &RetentionProfile,
) -> (Vec<Record>, Vec<Record>) {
    let kind_is = |row: &LedgerRow, kind: &str| {
        text::normalize_upper(&row.kind).contains(&text::normalize_upper(kind))
    };
    let reversal_marker = text::normalize_upper(&profile.reversal_marker);

    let mut retentions: Vec<&LedgerRow> = Vec::new();
    let mut retention_reversals: Vec<&LedgerRow> = Vec::new();
    let mut payments: Vec<&LedgerRow> = Vec::new();
    let mut payment_reversals: Vec<&LedgerRow> = Vec::new();

    for row in rows {
        if kind_is(row, &profile.retention_kind) {
            if row.flag == "C" {
                retentions.push(row);
            } else {
                retention_reversals.push(row);
            }
        } else if kind_is(row, &profile.payment_kind) && row.flag == "D" {
            payments.push(row);
        } else if row.flag == "C"
            && (text::normalize_upper(&row.kind).contains(&reversal_marker)
                || text::normalize_upper(&row.history).contains(&reversal_marker))
        {
            payment_reversals.push(row);
        }
    }

    cancel_reversals(&mut retentions, &retention_reversals);
    cancel_reversals(&mut payments, &payment_reversals);

    let to_record = |row: &LedgerRow, side: Side| Record {
        date: row.date,
        description: row.history.clone(),
        document: row.commitment.clone(),
        amount: row.amount,
        side,
    };
    (
        retentions
            .into_iter()
            .map(|row| to_record(row, Side::Statement))
            .collect(),
        payments
            .into_iter()
            .map(|row| to_record(row, Side::Ledger))
            .collect(),
    )
}

/// Each reversal removes the first surviving original with the same
/// commitment and an equal amount; unmatched reversals are left for the
/// reviewer to see in the residue.
fn cancel_reversals(originals: &mut Vec<&LedgerRow>, reversals: &[&LedgerRow]) {
    let tolerance = Money::from_cents(1);
    for reversal in reversals {
        if let Some(pos) = originals.iter().position(|original| {
            original.commitment == reversal.commitment
                && original.amount.gap(reversal.amount) < tolerance
        }) {
            originals.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(flag: &str, commitment: &str, kind: &str, history: &str, cents: i64) -> LedgerRow {
        LedgerRow {
            entry: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 10),
            flag: flag.to_string(),
            account: String::new(),
            amount: Money::from_cents(cents),
            commitment: commitment.to_string(),
            kind: kind.to_string(),
            history: history.to_string(),
        }
    }

    #[test]
    fn splits_retentions_and_payments() {
        let rows = vec![
            row("C", "900", "Retenção Empenho", "INSS FOLHA", 75_00),
            row("D", "900", "Pagamento de Documento Extra", "GPS INSS", 75_00),
            row("D", "901", "Pagamento de OB", "OUTRO", 10_00),
        ];
        let (retentions, payments) = split_retentions(&rows, &RetentionProfile::default());
        assert_eq!(retentions.len(), 1);
        assert_eq!(retentions[0].side, Side::Statement);
        assert_eq!(retentions[0].document, "900");
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].side, Side::Ledger);
    }

    #[test]
    fn retention_reversal_cancels_original() {
        let rows = vec![
            row("C", "900", "Retenção Empenho", "INSS", 75_00),
            row("D", "900", "Retenção Empenho", "ESTORNO RETENCAO", 75_00),
        ];
        let (retentions, _) = split_retentions(&rows, &RetentionProfile::default());
        assert!(retentions.is_empty());
    }

    #[test]
    fn payment_reversal_found_by_history_mention() {
        let rows = vec![
            row("D", "900", "Pagamento de Documento Extra", "GPS", 75_00),
            row("C", "900", "Arrecadação", "Estorno de pagamento GPS", 75_00),
        ];
        let (_, payments) = split_retentions(&rows, &RetentionProfile::default());
        assert!(payments.is_empty());
    }

    #[test]
    fn reversal_cancels_only_first_matching_original() {
        let rows = vec![
            row("C", "900", "Retenção Empenho", "PRIMEIRA", 75_00),
            row("C", "900", "Retenção Empenho", "SEGUNDA", 75_00),
            row("D", "900", "Retenção Empenho", "ESTORNO", 75_00),
        ];
        let (retentions, _) = split_retentions(&rows, &RetentionProfile::default());
        assert_eq!(retentions.len(), 1);
        assert_eq!(retentions[0].description, "SEGUNDA");
    }

    #[test]
    fn reversal_with_different_commitment_cancels_nothing() {
        let rows = vec![
            row("C", "900", "Retenção Empenho", "INSS", 75_00),
            row("D", "999", "Retenção Empenho", "ESTORNO", 75_00),
        ];
        let (retentions, _) = split_retentions(&rows, &RetentionProfile::default());
        assert_eq!(retentions.len(), 1);
    }
}
