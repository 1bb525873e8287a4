use serde::{Deserialize, Serialize};

use concilia_core::{DocPolicy, Money, Record, DOC_MISMATCH};

use crate::group::group_and_sum;
use crate::predicate::PairFilter;
use crate::result::{GroupedRow, MatchTier, MatchedPair, Reconciliation, ResidualRecord};

/// Date criterion of the pairwise passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRule {
    /// Candidates must share the record's exact date (bank reconciliation).
    #[default]
    SameDay,
    /// No date criterion; temporal constraints come from pair filters
    /// instead (retention reconciliation, where the payment trails the
    /// retention by days or months).
    Any,
}

/// Candidate-selection policy when several ledger records satisfy a pass's
/// criteria for the same statement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// First unconsumed candidate in ledger-collection order. The historical
    /// behavior; keeps runs reproducible for a given input ordering.
    #[default]
    CollectionOrder,
    /// Smallest amount gap, collection order breaking exact ties.
    SmallestGap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MatchSettings {
    /// Amount comparisons are `|a − b| < tolerance`, never exact equality.
    pub tolerance: Money,
    pub doc_policy: DocPolicy,
    pub date_rule: DateRule,
    pub tie_break: TieBreak,
    /// Let a dateless ledger record date-match anything in the value-only
    /// pass. Off by default; kept as a supported mode because ledger exports
    /// with unparseable dates exist in the wild.
    pub undated_wildcard: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            tolerance: Money::from_cents(1),
            doc_policy: DocPolicy::default(),
            date_rule: DateRule::default(),
            tie_break: TieBreak::default(),
            undated_wildcard: false,
        }
    }
}

impl MatchSettings {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn amounts_agree(&self, a: Money, b: Money) -> bool {
        a.gap(b) < self.tolerance
    }
}

/// The reconciliation engine: a strict ordered sequence of matching passes,
/// each operating only on records not consumed by an earlier one. Consumption
/// is tracked against input-collection indices; the inputs themselves are
/// never mutated or reordered.
pub struct Matcher {
    settings: MatchSettings,
    filters: Vec<Box<dyn PairFilter>>,
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::new(MatchSettings::default())
    }
}

impl Matcher {
    pub fn new(settings: MatchSettings) -> Self {
        Matcher {
            settings,
            filters: Vec::new(),
        }
    }

    /// Install an extra admission predicate for the pairwise passes.
    /// Filters are ANDed; the grouped pass is unaffected.
    pub fn with_filter(mut self, filter: impl PairFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Run all passes. Never fails for business-data reasons; empty inputs
    /// produce an empty, well-formed outcome.
    pub fn reconcile(&self, statement: &[Record], ledger: &[Record]) -> Reconciliation {
        let mut statement_used = vec![false; statement.len()];
        let mut ledger_used = vec![false; ledger.len()];
        let mut matched = Vec::new();

        self.pairwise_pass(
            MatchTier::Exact,
            statement,
            ledger,
            &mut statement_used,
            &mut ledger_used,
            &mut matched,
        );
        self.pairwise_pass(
            MatchTier::ValueOnly,
            statement,
            ledger,
            &mut statement_used,
            &mut ledger_used,
            &mut matched,
        );

        let statement_residue = residue(statement, &statement_used);
        let ledger_residue = residue(ledger, &ledger_used);
        let grouped = self.grouped_pass(&statement_residue, &ledger_residue);

        tracing::debug!(
            matched = matched.len(),
            statement_residue = statement_residue.len(),
            ledger_residue = ledger_residue.len(),
            groups = grouped.len(),
            "reconciliation finished"
        );

        Reconciliation {
            matched,
            statement_residue,
            ledger_residue,
            grouped,
        }
    }

    fn pairwise_pass(
        &self,
        tier: MatchTier,
        statement: &[Record],
        ledger: &[Record],
        statement_used: &mut [bool],
        ledger_used: &mut [bool],
        matched: &mut Vec<MatchedPair>,
    ) {
        for (si, s) in statement.iter().enumerate() {
            if statement_used[si] {
                continue;
            }
            let Some(li) = self.pick_candidate(tier, s, ledger, ledger_used) else {
                continue;
            };
            statement_used[si] = true;
            ledger_used[li] = true;
            matched.push(MatchedPair {
                document: match tier {
                    MatchTier::Exact => s.document.clone(),
                    _ => DOC_MISMATCH.to_string(),
                },
                statement: s.clone(),
                ledger: ledger[li].clone(),
                tier,
                difference: Money::zero(),
            });
        }
    }

    fn pick_candidate(
        &self,
        tier: MatchTier,
        s: &Record,
        ledger: &[Record],
        ledger_used: &[bool],
    ) -> Option<usize> {
        let mut best: Option<(usize, Money)> = None;
        for (li, l) in ledger.iter().enumerate() {
            if ledger_used[li] || !self.admissible(tier, s, l) {
                continue;
            }
            match self.settings.tie_break {
                TieBreak::CollectionOrder => return Some(li),
                TieBreak::SmallestGap => {
                    let gap = s.amount.gap(l.amount);
                    if best.map_or(true, |(_, b)| gap < b) {
                        best = Some((li, gap));
                    }
                }
            }
        }
        best.map(|(li, _)| li)
    }

    fn admissible(&self, tier: MatchTier, s: &Record, l: &Record) -> bool {
        let dates_align = match self.settings.date_rule {
            DateRule::SameDay => match (s.date, l.date) {
                (Some(a), Some(b)) => a == b,
                // A dateless ledger record only matches under the wildcard
                // mode, and only once document identity no longer constrains
                // the pair.
                (Some(_), None) => tier == MatchTier::ValueOnly && self.settings.undated_wildcard,
                (None, _) => false,
            },
            DateRule::Any => true,
        };
        dates_align
            && (tier != MatchTier::Exact
                || self.settings.doc_policy.matches(&s.document, &l.document))
            && self.settings.amounts_agree(s.amount, l.amount)
            && self.filters.iter().all(|f| f.accept(s, l))
    }

    /// Full outer join of both residues over (date, document): one row per
    /// key, per-side sums, missing side exactly zero. This is how
    /// many-to-many residue (several partial postings against one aggregated
    /// statement line) reconciles without subset-sum search.
    fn grouped_pass(
        &self,
        statement_residue: &[ResidualRecord],
        ledger_residue: &[ResidualRecord],
    ) -> Vec<GroupedRow> {
        let key = |r: &ResidualRecord| (r.record.date, r.record.document.clone());
        let amount = |r: &ResidualRecord| r.record.amount;

        let statement_groups = group_and_sum(statement_residue, key, amount);
        let ledger_groups = group_and_sum(ledger_residue, key, amount);

        let mut by_key: std::collections::BTreeMap<_, GroupedRow> = statement_groups
            .into_iter()
            .map(|g| {
                let first = g.members[0];
                let row = GroupedRow {
                    date: g.key.0,
                    document: g.key.1.clone(),
                    description: statement_residue[first].record.description.clone(),
                    statement_total: g.total,
                    ledger_total: Money::zero(),
                    difference: g.total,
                    statement_members: g
                        .members
                        .iter()
                        .map(|&pos| statement_residue[pos].index)
                        .collect(),
                    ledger_members: Vec::new(),
                    balanced: false,
                };
                (g.key, row)
            })
            .collect();

        for g in ledger_groups {
            let row = by_key.entry(g.key.clone()).or_insert_with(|| GroupedRow {
                date: g.key.0,
                document: g.key.1.clone(),
                // Ledger-only groups have no statement narrative to show.
                description: "S/H".to_string(),
                statement_total: Money::zero(),
                ledger_total: Money::zero(),
                difference: Money::zero(),
                statement_members: Vec::new(),
                ledger_members: Vec::new(),
                balanced: false,
            });
            row.ledger_total = g.total;
            row.ledger_members = g
                .members
                .iter()
                .map(|&pos| ledger_residue[pos].index)
                .collect();
        }

        let mut rows: Vec<GroupedRow> = by_key.into_values().collect();
        for row in &mut rows {
            row.difference = row.statement_total - row.ledger_total;
            row.balanced = self
                .settings
                .amounts_agree(row.statement_total, row.ledger_total);
        }
        rows
    }
}

fn residue(records: &[Record], used: &[bool]) -> Vec<ResidualRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(index, record)| ResidualRecord {
            index,
            record: record.clone(),
        })
        .collect()
}
