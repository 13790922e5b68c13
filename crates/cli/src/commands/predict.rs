//! `churnctl predict`

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tabled::Tabled;

use crate::client::{ApiClient, PredictionRecord};
use crate::output::{
    color_impact, color_label, color_probability, color_risk, print_info, print_json,
    OutputFormat,
};

/// Customer attributes, from a JSON file and/or individual flags
#[derive(Debug, Default, Args)]
pub struct CustomerArgs {
    /// JSON file with the customer record; flags override its fields
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Contract type (Month-to-month, One year, Two year)
    #[arg(long)]
    pub contract: Option<String>,

    #[arg(long)]
    pub monthly_charges: Option<f64>,

    #[arg(long)]
    pub num_referrals: Option<f64>,

    /// Yes or No
    #[arg(long)]
    pub dependents: Option<String>,

    #[arg(long)]
    pub total_charges: Option<f64>,

    /// Tenure in months
    #[arg(long)]
    pub tenure: Option<f64>,

    #[arg(long)]
    pub payment_method: Option<String>,

    #[arg(long)]
    pub online_backup: Option<String>,

    #[arg(long)]
    pub online_security: Option<String>,

    #[arg(long)]
    pub tech_support: Option<String>,
}

impl CustomerArgs {
    /// Build the request body. Missing fields are left for the service
    /// to report so the error lists all of them at once.
    pub fn into_record(self) -> Result<Value> {
        let mut fields = match &self.file {
            Some(path) => read_record(path)?,
            None => Map::new(),
        };

        let text = [
            ("contract", self.contract),
            ("dependents", self.dependents),
            ("paymentMethod", self.payment_method),
            ("onlineBackup", self.online_backup),
            ("onlineSecurity", self.online_security),
            ("techSupport", self.tech_support),
        ];
        for (key, value) in text {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value));
            }
        }

        let numeric = [
            ("monthlyCharges", self.monthly_charges),
            ("numReferrals", self.num_referrals),
            ("totalCharges", self.total_charges),
            ("tenure", self.tenure),
        ];
        for (key, value) in numeric {
            if let Some(number) = value.and_then(serde_json::Number::from_f64) {
                fields.insert(key.to_string(), Value::Number(number));
            }
        }

        Ok(Value::Object(fields))
    }
}

fn read_record(path: &Path) -> Result<Map<String, Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str::<Value>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?
    {
        Value::Object(fields) => Ok(fields),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

#[derive(Tabled)]
struct FactorRow {
    #[tabled(rename = "Factor")]
    feature: String,
    #[tabled(rename = "Contribution")]
    value: String,
    #[tabled(rename = "Impact")]
    impact: String,
}

/// Score a customer and print the result
pub async fn predict(client: &ApiClient, args: CustomerArgs, format: OutputFormat) -> Result<()> {
    let customer = args.into_record()?;
    let record = client.predict(&customer).await?;

    match format {
        OutputFormat::Json => print_json(&record)?,
        OutputFormat::Table => print_record(&record),
    }
    Ok(())
}

fn print_record(record: &PredictionRecord) {
    println!("Prediction:  {}", color_label(&record.prediction));
    println!("Probability: {}", color_probability(record.probability));
    println!("Risk level:  {}", color_risk(&record.risk_level));
    println!("ID:          {}", record.id);

    if record.shap_values.is_empty() {
        print_info("No explanation factors returned");
        return;
    }

    let rows: Vec<FactorRow> = record
        .shap_values
        .iter()
        .map(|f| FactorRow {
            feature: f.feature.clone(),
            value: format!("{:+.3}", f.value),
            impact: color_impact(&f.impact),
        })
        .collect();

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("\n{}", table);
}
