//! `churnctl history` and `churnctl purge`

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, HistoryQuery};
use crate::output::{
    color_label, color_probability, color_risk, format_timestamp, print_json, print_success,
    print_warning, truncate_id, OutputFormat,
};

/// Row for history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Top Factor")]
    top_factor: String,
}

/// List the caller's prediction history
pub async fn show_history(client: &ApiClient, query: HistoryQuery, format: OutputFormat) -> Result<()> {
    let page = client.history(&query).await?;

    match format {
        OutputFormat::Json => print_json(&page)?,
        OutputFormat::Table => {
            if page.predictions.is_empty() {
                print_warning("No predictions found");
                return Ok(());
            }

            let rows: Vec<HistoryRow> = page
                .predictions
                .iter()
                .map(|p| HistoryRow {
                    id: truncate_id(&p.id),
                    timestamp: format_timestamp(&p.timestamp),
                    prediction: color_label(&p.prediction),
                    probability: color_probability(p.probability),
                    risk: color_risk(&p.risk_level),
                    top_factor: p
                        .shap_values
                        .first()
                        .map(|f| f.feature.clone())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!(
                "\nShowing {} of {} predictions (page {})",
                page.predictions.len(),
                page.total,
                query.page.unwrap_or(1)
            );
        }
    }

    Ok(())
}

/// Delete all stored predictions
pub async fn purge(client: &ApiClient, yes: bool, format: OutputFormat) -> Result<()> {
    if !yes {
        print_warning("This deletes the prediction history of every user. Re-run with --yes to confirm.");
        return Ok(());
    }

    let result = client.purge().await?;
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| "History cleared".to_string());
            print_success(&format!("{} ({} deleted)", message, result.deleted_count));
        }
    }
    Ok(())
}
