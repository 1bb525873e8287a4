use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use concilia_core::{text, Money, Record, Side, DOC_FEES, DOC_NOT_FOUND, DOC_UNKNOWN};

use crate::util::{clean_cell_number, parse_br_amount, parse_br_date};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid ledger profile: {0}")]
    Profile(#[from] toml::de::Error),
}

/// Column map for a general-ledger export. These files have no reliable
/// header row; every field is addressed by zero-based position, and the
/// positions drift between systems, so the whole map is overridable (and
/// loadable from TOML).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LedgerProfile {
    pub delimiter: String,
    pub entry_column: usize,
    pub date_column: usize,
    pub flag_column: usize,
    pub account_column: usize,
    pub amount_column: usize,
    pub commitment_column: usize,
    pub kind_column: usize,
    /// Candidate narrative columns; the first non-empty cell per row wins
    /// (exports place the history in different spots).
    pub history_columns: Vec<usize>,
    /// Rows whose kind contains any of these are kept regardless of flag.
    pub keep_kinds: Vec<String>,
    /// Rows whose kind contains any of these are kept only when credited
    /// (same-unit transfers show up as credits).
    pub keep_credit_kinds: Vec<String>,
    /// Keep rows whose date failed to parse, for the wildcard matching mode.
    pub keep_undated: bool,
}

impl Default for LedgerProfile {
    fn default() -> Self {
        LedgerProfile {
            delimiter: ";".to_string(),
            entry_column: 1,
            date_column: 4,
            flag_column: 5,
            account_column: 6,
            amount_column: 8,
            commitment_column: 14,
            kind_column: 19,
            history_columns: vec![27, 21],
            keep_kinds: vec!["Pagamento".to_string()],
            keep_credit_kinds: vec!["TRANSFERENCIA ENTRE CONTAS DE MESMA UG".to_string()],
            keep_undated: false,
        }
    }
}

/// One parsed export row, before any reconciliation-specific filtering.
#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub entry: String,
    pub date: Option<NaiveDate>,
    pub flag: String,
    pub account: String,
    pub amount: Money,
    pub commitment: String,
    pub kind: String,
    pub history: String,
}

impl LedgerProfile {
    pub fn from_toml(content: &str) -> Result<Self, LedgerError> {
        Ok(toml::from_str(content)?)
    }

    /// Read every row that yields a valid amount (and date, unless
    /// `keep_undated`). Rows that don't are dropped, not errors: these
    /// exports carry headers, subtotals and stray footers mid-file.
    pub fn read_rows(&self, data: &[u8]) -> Result<Vec<LedgerRow>, LedgerError> {
        let decoded = decode_text(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter.as_bytes().first().copied().unwrap_or(b';'))
            .from_reader(decoded.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let cell =
                |column: usize| record.get(column).unwrap_or_default().trim().to_string();

            let Some(amount) = parse_br_amount(&cell(self.amount_column)) else {
                tracing::debug!(row = ?record.position(), "dropping row without amount");
                continue;
            };
            let date = parse_br_date(&cell(self.date_column), None);
            if date.is_none() && !self.keep_undated {
                tracing::debug!(row = ?record.position(), "dropping row without date");
                continue;
            }

            let history = self
                .history_columns
                .iter()
                .map(|&column| cell(column))
                .find(|h| !h.is_empty())
                .unwrap_or_default();

            rows.push(LedgerRow {
                entry: clean_cell_number(&cell(self.entry_column)),
                date,
                flag: cell(self.flag_column).to_uppercase(),
                account: cell(self.account_column),
                amount,
                commitment: clean_cell_number(&cell(self.commitment_column)),
                kind: cell(self.kind_column),
                history,
            });
        }
        Ok(rows)
    }

    /// The payment rows reconciled against a bank statement, as matcher
    /// records. Documents start empty; `assign_documents` backfills them
    /// from the statement side.
    pub fn payment_records(&self, rows: &[LedgerRow]) -> Vec<Record> {
        rows.iter()
            .filter(|row| self.keeps(row))
            .map(|row| Record {
                date: row.date,
                description: row.history.clone(),
                document: String::new(),
                amount: row.amount,
                side: Side::Ledger,
            })
            .collect()
    }

    fn keeps(&self, row: &LedgerRow) -> bool {
        let kind = text::normalize_upper(&row.kind);
        if self
            .keep_kinds
            .iter()
            .any(|k| kind.contains(&text::normalize_upper(k)))
        {
            return true;
        }
        row.flag == "C"
            && self
                .keep_credit_kinds
                .iter()
                .any(|k| kind.contains(&text::normalize_upper(k)))
    }
}

fn re_digit_run() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\d+").expect("invalid regex"))
}

/// Ledger narratives carry no document column; borrow the code from the
/// statement side. For each ledger record, the digit runs of its narrative
/// are checked (left zeros trimmed) against the statement documents of the
/// same date; fee narratives map to the fee pseudo-document when that day has
/// an aggregated fee record.
pub fn assign_documents(ledger: &mut [Record], statement: &[Record]) {
    let mut docs_by_date: HashMap<Option<NaiveDate>, Vec<&str>> = HashMap::new();
    for s in statement {
        docs_by_date.entry(s.date).or_default().push(&s.document);
    }

    for record in ledger.iter_mut() {
        let Some(docs) = docs_by_date.get(&record.date) else {
            record.document = DOC_UNKNOWN.to_string();
            continue;
        };
        let history = text::normalize_upper(&record.description);
        if history.contains("TARIFA") && docs.iter().any(|d| *d == DOC_FEES) {
            record.document = DOC_FEES.to_string();
            continue;
        }
        record.document = re_digit_run()
            .find_iter(&history)
            .find_map(|run| {
                let run = run.as_str().trim_start_matches('0');
                if run.is_empty() {
                    return None;
                }
                docs.iter()
                    .find(|doc| text::digits(doc).trim_start_matches('0') == run)
                    .map(|doc| doc.to_string())
            })
            .unwrap_or_else(|| DOC_NOT_FOUND.to_string());
    }
}

fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        // Legacy exports arrive in Latin-1; bytes map straight to code points.
        Err(_) => data.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_row(
        entry: &str,
        date: &str,
        flag: &str,
        amount: &str,
        commitment: &str,
        kind: &str,
        history: &str,
    ) -> String {
        let mut cells = vec![String::new(); 28];
        cells[1] = entry.to_string();
        cells[4] = date.to_string();
        cells[5] = flag.to_string();
        cells[8] = amount.to_string();
        cells[14] = commitment.to_string();
        cells[19] = kind.to_string();
        cells[27] = history.to_string();
        cells.join(";")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reads_rows_and_drops_garbage() {
        let data = [
            csv_row("101.0", "05/03/2024", "D", "1.500,00", "1234.0", "Pagamento de OB", "PAGTO 001234"),
            "RELATORIO GERAL;;;;;;;".to_string(), // header noise
            csv_row("102.0", "", "D", "10,00", "", "Pagamento", "SEM DATA"),
        ]
        .join("\n");
        let rows = LedgerProfile::default().read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry, "101");
        assert_eq!(rows[0].commitment, "1234");
        assert_eq!(rows[0].amount.to_cents(), 150_000);
        assert_eq!(rows[0].date, Some(date(2024, 3, 5)));
    }

    #[test]
    fn keep_undated_mode_retains_dateless_rows() {
        let data = csv_row("1", "", "D", "10,00", "", "Pagamento", "SEM DATA");
        let profile = LedgerProfile {
            keep_undated: true,
            ..LedgerProfile::default()
        };
        let rows = profile.read_rows(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, None);
    }

    #[test]
    fn payment_filter_keeps_payments_and_credit_transfers() {
        let data = [
            csv_row("1", "05/03/2024", "D", "100,00", "", "Pagamento de OB", "A"),
            csv_row("2", "05/03/2024", "D", "200,00", "", "Arrecadação", "B"),
            csv_row("3", "05/03/2024", "C", "300,00", "", "TRANSFERENCIA ENTRE CONTAS DE MESMA UG", "C"),
            csv_row("4", "05/03/2024", "D", "400,00", "", "TRANSFERENCIA ENTRE CONTAS DE MESMA UG", "D"),
        ]
        .join("\n");
        let profile = LedgerProfile::default();
        let rows = profile.read_rows(data.as_bytes()).unwrap();
        let records = profile.payment_records(&rows);
        let kept: Vec<_> = records.iter().map(|r| r.amount.to_cents()).collect();
        assert_eq!(kept, vec![10_000, 30_000]);
    }

    #[test]
    fn latin1_exports_still_classify() {
        // "Retenção" encoded as Latin-1 (0xE7 = ç, 0xE3 = ã) is not UTF-8.
        let mut data = Vec::new();
        data.extend_from_slice(b";1;;;05/03/2024;C;;;75,00;;;;;;900;;;;;Reten\xE7\xE3o Empenho;;;;;;;;FOLHA");
        let rows = LedgerProfile::default().read_rows(&data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(text::normalize_upper(&rows[0].kind), "RETENCAO EMPENHO");
    }

    #[test]
    fn assign_documents_matches_digit_runs() {
        let statement = vec![Record::new(
            date(2024, 3, 5),
            "PAGTO FORNECEDOR",
            "001234",
            Money::from_cents(150_00),
            Side::Statement,
        )];
        let mut ledger = vec![Record {
            date: Some(date(2024, 3, 5)),
            description: "OB 1234 FORNECEDOR LTDA".to_string(),
            document: String::new(),
            amount: Money::from_cents(150_00),
            side: Side::Ledger,
        }];
        assign_documents(&mut ledger, &statement);
        assert_eq!(ledger[0].document, "001234");
    }

    #[test]
    fn assign_documents_maps_fee_narratives() {
        let statement = vec![Record::new(
            date(2024, 3, 5),
            "Tarifas Bancárias do Dia",
            DOC_FEES,
            Money::from_cents(15_00),
            Side::Statement,
        )];
        let mut ledger = vec![Record {
            date: Some(date(2024, 3, 5)),
            description: "TARIFA BANCARIA PACOTE SERVICOS".to_string(),
            document: String::new(),
            amount: Money::from_cents(15_00),
            side: Side::Ledger,
        }];
        assign_documents(&mut ledger, &statement);
        assert_eq!(ledger[0].document, DOC_FEES);
    }

    #[test]
    fn assign_documents_sentinels() {
        let statement = vec![Record::new(
            date(2024, 3, 5),
            "PAGTO",
            "001234",
            Money::from_cents(150_00),
            Side::Statement,
        )];
        let mut ledger = vec![
            Record {
                date: Some(date(2024, 3, 6)), // no statement docs that day
                description: "OB 1234".to_string(),
                document: String::new(),
                amount: Money::from_cents(1),
                side: Side::Ledger,
            },
            Record {
                date: Some(date(2024, 3, 5)), // day known, code unknown
                description: "OB 777".to_string(),
                document: String::new(),
                amount: Money::from_cents(1),
                side: Side::Ledger,
            },
        ];
        assign_documents(&mut ledger, &statement);
        assert_eq!(ledger[0].document, DOC_UNKNOWN);
        assert_eq!(ledger[1].document, DOC_NOT_FOUND);
    }

    #[test]
    fn profile_from_toml_overrides_positions() {
        let profile = LedgerProfile::from_toml(
            "amount-column = 3\nkeep-kinds = [\"Repasse\"]\ndelimiter = \",\"\n",
        )
        .unwrap();
        assert_eq!(profile.amount_column, 3);
        assert_eq!(profile.keep_kinds, vec!["Repasse".to_string()]);
        // Untouched fields keep their defaults.
        assert_eq!(profile.date_column, 4);
    }
}
