//! `churnctl stats`

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Show dashboard statistics for the caller's history
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.dashboard_stats().await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            let rows = vec![
                StatRow { metric: "Total predictions", value: stats.total_predictions.to_string() },
                StatRow { metric: "Churn rate", value: format!("{:.1}%", stats.churn_rate) },
                StatRow { metric: "Average probability", value: format!("{:.1}%", stats.avg_probability) },
                StatRow { metric: "High-risk customers", value: stats.high_risk_customers.to_string() },
                StatRow { metric: "Model accuracy", value: format!("{:.1}%", stats.prediction_accuracy) },
                StatRow { metric: "Precision", value: format!("{:.1}%", stats.precision) },
                StatRow { metric: "Recall", value: format!("{:.1}%", stats.recall) },
                StatRow { metric: "F1 score", value: format!("{:.1}%", stats.f1_score) },
                StatRow { metric: "AUC", value: format!("{:.1}%", stats.auc) },
            ];

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
