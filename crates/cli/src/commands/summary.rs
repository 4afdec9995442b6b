//! Fleet summary command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_currency, print_warning, OutputFormat};

/// Row for the scenario table
#[derive(Tabled, serde::Serialize)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Assumed Savings")]
    fraction: String,
    #[tabled(rename = "Saved Cost")]
    saved_cost: String,
    #[tabled(rename = "Saved CO2")]
    saved_co2: String,
}

/// Show fleet totals, scenarios and the validation factor
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let dashboard = client.dashboard().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&dashboard)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{}", "Fleet Summary".bold());
            println!("{}", "=".repeat(50));
            println!("State:                  {}", color_status(&dashboard.state));
            if dashboard.state == "auth_required" {
                print_warning("A data feed needs re-authentication; figures are incomplete");
            }

            let totals = &dashboard.totals;
            println!("Instances:              {} ({} running)", totals.instance_count, totals.running_count);
            println!("Fully measured:         {}", totals.measured_count);
            println!("Runtime:                {:.2}h", totals.total_runtime_hours);
            println!();

            println!("{}", "Cost & Emissions".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Total cost:             {} / {}",
                format_currency(totals.total_cost_usd, "USD"),
                format_currency(totals.total_cost_eur, "EUR")
            );
            println!("Total CO2:              {:.2}kg", totals.total_co2_kg);
            if let Some(monthly) = &dashboard.monthly_cost {
                println!(
                    "Billed this month:      {}",
                    format_currency(monthly.amount_eur, "EUR")
                );
            }
            println!(
                "Validation factor:      {:.2} {}",
                dashboard.validation_factor,
                "(billing / bottom-up estimate)".dimmed()
            );
            println!();

            if !dashboard.scenarios.is_empty() {
                println!("{}", "Optimization Scenarios".bold());
                println!("{}", "-".repeat(50));
                let rows: Vec<ScenarioRow> = dashboard
                    .scenarios
                    .iter()
                    .map(|s| ScenarioRow {
                        name: s.spec.name.clone(),
                        fraction: format!("{:.0}%", s.spec.savings_fraction * 100.0),
                        saved_cost: format_currency(s.saved_cost_eur, "EUR"),
                        saved_co2: format!("{:.2}kg", s.saved_co2_kg),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}
