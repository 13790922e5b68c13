//! `churnctl health`

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show service health and per-component status
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("Service:  {}", color_status(&report.summary.status));
            println!("Overall:  {}", color_status(&report.components.status));
            println!("Database: {}", color_status(&report.summary.database));
            println!("Models:   {}", color_status(&report.summary.models));

            let mut names: Vec<&String> = report.components.components.keys().collect();
            names.sort();
            let rows: Vec<ComponentRow> = names
                .into_iter()
                .map(|name| {
                    let component = &report.components.components[name];
                    ComponentRow {
                        name: name.clone(),
                        status: color_status(&component.status),
                        message: component.message.clone().unwrap_or_default(),
                    }
                })
                .collect();

            if !rows.is_empty() {
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("\n{}", table);
            }
        }
    }

    Ok(())
}
