use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use concilia_core::{text, Money, Record, Side, DOC_FEES};

use crate::util::{parse_br_amount, parse_br_date};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// A statement line starts with dd/mm or dd/mm/yyyy and carries a Brazilian
// amount with a debit/credit marker somewhere after the narrative.
re!(re_line_date, r"^(\d{2}/\d{2}(?:/\d{4})?)");
re!(re_amount_marker, r"(\d{1,3}(?:\.\d{3})*,\d{2})\s?([DC])");

/// Everything bank-specific about reading a statement's text. Defaults match
/// the layouts this tool is pointed at; all of it is overridable per account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StatementProfile {
    /// Year appended to `dd/mm` dates (statements often omit it).
    pub reference_year: i32,
    /// Fee lines are recognized by this code in the narrative and folded
    /// into one synthetic record per day.
    pub fee_code: String,
    /// Narrative shown on the synthetic daily fee record.
    pub fee_description: String,
    /// Lines whose narrative contains any of these are not transactions
    /// (balance carry-overs, automatic investment sweeps).
    pub excluded_terms: Vec<String>,
    /// Credit lines containing any of these cancel an equal debit of the
    /// same date instead of becoming records themselves.
    pub refund_markers: Vec<String>,
}

impl Default for StatementProfile {
    fn default() -> Self {
        StatementProfile {
            reference_year: 2024,
            fee_code: "13113".to_string(),
            fee_description: "Tarifas Bancárias do Dia".to_string(),
            excluded_terms: vec![
                "SALDO".to_string(),
                "S A L D O".to_string(),
                "RESGATE".to_string(),
                "BB-APLIC".to_string(),
            ],
            refund_markers: vec!["TED DEVOLVIDA".to_string(), "DEVOLUCAO".to_string()],
        }
    }
}

impl StatementProfile {
    pub fn new(reference_year: i32) -> Self {
        StatementProfile {
            reference_year,
            ..StatementProfile::default()
        }
    }
}

/// Best-effort extraction of debit transactions from bank-statement text.
/// Lines that do not parse are dropped, not errors: layouts vary too much to
/// guarantee full capture, and the reconciliation downstream is built to take
/// partial input.
pub struct StatementParser {
    profile: StatementProfile,
}

impl StatementParser {
    pub fn new(profile: StatementProfile) -> Self {
        StatementParser { profile }
    }

    pub fn parse(&self, statement_text: &str) -> Vec<Record> {
        let mut debits = Vec::new();
        let mut refunds = Vec::new();

        for line in statement_text.lines() {
            let line = line.trim();
            let Some(date_cap) = re_line_date().captures(line) else {
                continue;
            };
            let Some(date) = parse_br_date(&date_cap[1], Some(self.profile.reference_year)) else {
                tracing::debug!(line, "dropping line with unparseable date");
                continue;
            };
            let Some(amount_cap) = re_amount_marker().captures(line) else {
                continue;
            };
            let Some(amount) = parse_br_amount(&amount_cap[1]) else {
                continue;
            };

            let narrative = line
                .replacen(&date_cap[0], "", 1)
                .replacen(&amount_cap[0], "", 1)
                .trim()
                .to_string();
            if self.is_excluded(&narrative) {
                continue;
            }

            match &amount_cap[2] {
                "D" => debits.push(Record {
                    date: Some(date),
                    document: debit_document(&narrative),
                    description: narrative,
                    amount,
                    side: Side::Statement,
                }),
                _ => {
                    if self.is_refund(&narrative) {
                        refunds.push((date, amount));
                    }
                }
            }
        }

        cancel_refunded_debits(&mut debits, &refunds);
        self.aggregate_fees(debits)
    }

    fn is_excluded(&self, narrative: &str) -> bool {
        let norm = text::normalize_upper(narrative);
        self.profile
            .excluded_terms
            .iter()
            .any(|t| norm.contains(&text::normalize_upper(t)))
    }

    fn is_refund(&self, narrative: &str) -> bool {
        let norm = text::normalize_upper(narrative);
        self.profile
            .refund_markers
            .iter()
            .any(|m| norm.contains(&text::normalize_upper(m)))
    }

    /// Fold all fee lines of one day into a single synthetic record carrying
    /// the fee pseudo-document. Non-fee records keep statement order; the
    /// daily aggregates follow, in date order.
    fn aggregate_fees(&self, debits: Vec<Record>) -> Vec<Record> {
        let mut kept = Vec::with_capacity(debits.len());
        let mut fees: BTreeMap<Option<NaiveDate>, Money> = BTreeMap::new();
        for record in debits {
            if text::normalize_upper(&record.description).contains(&self.profile.fee_code) {
                let total = fees.entry(record.date).or_insert_with(Money::zero);
                *total = *total + record.amount;
            } else {
                kept.push(record);
            }
        }
        for (date, amount) in fees {
            kept.push(Record {
                date,
                description: self.profile.fee_description.clone(),
                document: DOC_FEES.to_string(),
                amount,
                side: Side::Statement,
            });
        }
        kept
    }
}

/// The document code of a debit line is the last numeric token of the
/// narrative with at least four digits, reduced to its final six.
fn debit_document(narrative: &str) -> String {
    narrative
        .split_whitespace()
        .rev()
        .find(|token| {
            let stripped: String = token.chars().filter(|c| *c != '.' && *c != '-').collect();
            stripped.len() >= 4 && stripped.chars().all(|c| c.is_ascii_digit())
        })
        .map(text::clean_document)
        .unwrap_or_default()
}

/// Each returned-transfer credit removes the first same-date debit of equal
/// amount still present; debit/credit self-cancellation inside the statement,
/// not a cross-side match.
fn cancel_refunded_debits(debits: &mut Vec<Record>, refunds: &[(NaiveDate, Money)]) {
    let tolerance = Money::from_cents(1);
    for (date, amount) in refunds {
        if let Some(pos) = debits
            .iter()
            .position(|d| d.date == Some(*date) && d.amount.gap(*amount) < tolerance)
        {
            tracing::debug!(%date, %amount, "cancelling refunded debit");
            debits.remove(pos);
        }
    }
}
