use concilia_core::Money;

use crate::rows::{ReportRow, RowKind};

const HEADERS: [&str; 7] = [
    "Data",
    "Documento",
    "Histórico",
    "Vlr. Extrato",
    "Vlr. Razão",
    "Diferença",
    "Status",
];

/// Differences under a cent print as a dash so the eye lands on real
/// divergences only.
fn difference_cell(difference: Money) -> String {
    if difference.abs() < Money::from_cents(1) {
        "-".to_string()
    } else {
        difference.to_string()
    }
}

fn date_cell(row: &ReportRow) -> String {
    row.date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

/// Spreadsheet rendering of the report, one record per row, summary rows
/// included (their kind is recoverable from the Status column being empty
/// and the description marker).
pub fn to_csv(rows: &[ReportRow]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record([
            date_cell(row),
            row.document.clone(),
            row.description.clone(),
            row.statement_amount.to_string(),
            row.ledger_amount.to_string(),
            difference_cell(row.difference),
            row.status.clone(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Screen preview: one plain table, summary rows carrying a class so the
/// page can shade them.
pub fn to_html(rows: &[ReportRow]) -> String {
    let mut out = String::from("<table class=\"reconciliation\">\n<thead><tr>");
    for header in HEADERS {
        out.push_str(&format!("<th>{}</th>", escape(header)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        let class = match row.kind {
            RowKind::Detail => "",
            RowKind::Subtotal => " class=\"subtotal\"",
            RowKind::GrandTotal => " class=\"grand-total\"",
        };
        out.push_str(&format!(
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td>{}</td></tr>\n",
            escape(&date_cell(row)),
            escape(&row.document),
            escape(&row.description),
            row.statement_amount,
            row.ledger_amount,
            escape(&difference_cell(row.difference)),
            escape(&row.status),
        ));
    }
    out.push_str("</tbody>\n</table>\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
