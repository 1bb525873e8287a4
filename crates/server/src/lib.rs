//! HTTP surface for the reconciliation pipeline: one endpoint that takes the
//! two uploads as text and answers the full report. Stateless; every request
//! is a single-shot run of normalize → match → render.

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use concilia_import::{
    assign_documents, split_retentions, LedgerProfile, RetentionProfile, StatementParser,
    StatementProfile,
};
use concilia_recon::{DateRule, MatchSettings, Matcher, MonthMentionCompatible, PaidOnOrAfter};
use concilia_report::{build_rows, to_csv, to_html, ReportOptions, ReportRow, StatusLabels};

pub fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reconcile", post(reconcile))
        .route("/reconcile/retentions", post(reconcile_retentions))
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    /// Text of the bank statement, one printed line per line.
    pub statement_text: String,
    /// The raw general-ledger CSV export.
    pub ledger_csv: String,
    #[serde(default)]
    pub options: RequestOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RequestOptions {
    /// Year completing `dd/mm` statement dates; defaults to the current one.
    pub reference_year: Option<i32>,
    pub daily_subtotals: bool,
    pub undated_wildcard: bool,
}

#[derive(Serialize)]
pub struct ReconcileResponse {
    pub summary: Summary,
    pub rows: Vec<ReportRow>,
    pub csv: String,
    pub html: String,
}

#[derive(Serialize)]
pub struct Summary {
    pub statement_records: usize,
    pub ledger_records: usize,
    pub matched: usize,
    pub statement_residue: usize,
    pub ledger_residue: usize,
    pub settled: bool,
}

async fn reconcile(
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, (StatusCode, String)> {
    let year = request
        .options
        .reference_year
        .unwrap_or_else(|| chrono::Utc::now().year());

    let statement = StatementParser::new(StatementProfile::new(year)).parse(&request.statement_text);

    let ledger_profile = LedgerProfile {
        keep_undated: request.options.undated_wildcard,
        ..LedgerProfile::default()
    };
    let ledger_rows = ledger_profile
        .read_rows(request.ledger_csv.as_bytes())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let mut ledger = ledger_profile.payment_records(&ledger_rows);
    assign_documents(&mut ledger, &statement);

    let settings = MatchSettings {
        undated_wildcard: request.options.undated_wildcard,
        ..MatchSettings::default()
    };
    let outcome = Matcher::new(settings).reconcile(&statement, &ledger);

    let report_options = ReportOptions {
        daily_subtotals: request.options.daily_subtotals,
        ..ReportOptions::default()
    };
    let rows = build_rows(&outcome, &report_options);
    let csv = to_csv(&rows).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let html = to_html(&rows);

    Ok(Json(ReconcileResponse {
        summary: Summary {
            statement_records: statement.len(),
            ledger_records: ledger.len(),
            matched: outcome.matched.len(),
            statement_residue: outcome.statement_residue.len(),
            ledger_residue: outcome.ledger_residue.len(),
            settled: outcome.is_settled(),
        },
        rows,
        csv,
        html,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RetentionRequest {
    /// The raw general-ledger CSV export; both sides come from it.
    pub ledger_csv: String,
    #[serde(default)]
    pub options: RetentionOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetentionOptions {
    pub daily_subtotals: bool,
    /// Also require month mentions in payment narratives to agree with the
    /// retention's month.
    pub month_compatibility: bool,
}

/// Retention reconciliation: retentions vs the payments that settle them,
/// both split out of one ledger export. The retention side plays the
/// statement role in the response, so `statement_residue` counts retentions
/// without payment and `ledger_residue` payments without retention.
async fn reconcile_retentions(
    Json(request): Json<RetentionRequest>,
) -> Result<Json<ReconcileResponse>, (StatusCode, String)> {
    let ledger_profile = LedgerProfile {
        keep_undated: true,
        ..LedgerProfile::default()
    };
    let rows = ledger_profile
        .read_rows(request.ledger_csv.as_bytes())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let (retentions, payments) = split_retentions(&rows, &RetentionProfile::default());

    let settings = MatchSettings {
        date_rule: DateRule::Any,
        undated_wildcard: true,
        ..MatchSettings::default()
    };
    let mut matcher = Matcher::new(settings).with_filter(PaidOnOrAfter);
    if request.options.month_compatibility {
        matcher = matcher.with_filter(MonthMentionCompatible);
    }
    let outcome = matcher.reconcile(&retentions, &payments);

    let report_options = ReportOptions {
        daily_subtotals: request.options.daily_subtotals,
        labels: StatusLabels::retention(),
    };
    let rows = build_rows(&outcome, &report_options);
    let csv = to_csv(&rows).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let html = to_html(&rows);

    Ok(Json(ReconcileResponse {
        summary: Summary {
            statement_records: retentions.len(),
            ledger_records: payments.len(),
            matched: outcome.matched.len(),
            statement_residue: outcome.statement_residue.len(),
            ledger_residue: outcome.ledger_residue.len(),
            settled: outcome.is_settled(),
        },
        rows,
        csv,
        html,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn ledger_csv_row(date: &str, flag: &str, amount: &str, kind: &str, history: &str) -> String {
        let mut cells = vec![String::new(); 28];
        cells[1] = "101".to_string();
        cells[4] = date.to_string();
        cells[5] = flag.to_string();
        cells[8] = amount.to_string();
        cells[14] = "900".to_string();
        cells[19] = kind.to_string();
        cells[27] = history.to_string();
        cells.join(";")
    }

    async fn post_reconcile(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::post("/reconcile")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_answers() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reconcile_matches_statement_against_ledger() {
        let body = serde_json::json!({
            "statement_text": "05/03/2024 PAGTO FORNECEDOR 001.234 1.500,00 D",
            "ledger_csv": ledger_csv_row(
                "05/03/2024", "D", "1.500,00", "Pagamento de OB", "OB 1234 FORNECEDOR"
            ),
            "options": { "reference-year": 2024 }
        });
        let (status, value) = post_reconcile(body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["summary"]["matched"], 1);
        assert_eq!(value["summary"]["settled"], true);
        assert_eq!(value["rows"][0]["status"], "Conciliado");
        assert!(value["csv"].as_str().unwrap().contains("Conciliado"));
        assert!(value["html"].as_str().unwrap().contains("grand-total"));
    }

    #[tokio::test]
    async fn retention_endpoint_pairs_retention_with_later_payment() {
        let csv = [
            ledger_csv_row("10/03/2024", "C", "75,00", "Retenção Empenho", "INSS FOLHA MARÇO"),
            ledger_csv_row("20/04/2024", "D", "75,00", "Pagamento de Documento Extra", "GPS INSS"),
        ]
        .join("\n");
        let body = serde_json::json!({ "ledger_csv": csv });
        let response = app()
            .oneshot(
                Request::post("/reconcile/retentions")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["summary"]["matched"], 1);
        assert_eq!(value["rows"][0]["status"], "Conciliado");
    }

    #[tokio::test]
    async fn retention_endpoint_labels_unpaid_retentions() {
        let csv = ledger_csv_row("10/03/2024", "C", "75,00", "Retenção Empenho", "INSS FOLHA");
        let body = serde_json::json!({ "ledger_csv": csv });
        let response = app()
            .oneshot(
                Request::post("/reconcile/retentions")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["summary"]["statement_residue"], 1);
        assert_eq!(value["rows"][0]["status"], "Retido s/ Pagto");
    }

    #[tokio::test]
    async fn reconcile_reports_residue() {
        let body = serde_json::json!({
            "statement_text": "05/03/2024 PAGTO FORNECEDOR 001.234 1.500,00 D",
            "ledger_csv": "",
            "options": { "reference-year": 2024 }
        });
        let (status, value) = post_reconcile(body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["summary"]["matched"], 0);
        assert_eq!(value["summary"]["statement_residue"], 1);
        assert_eq!(value["summary"]["settled"], false);
    }
}
