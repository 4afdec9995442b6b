//! Aligned cost/carbon series command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_co2_g, format_currency, print_table, OutputFormat};

/// Row for the series table
#[derive(Tabled, serde::Serialize)]
struct SeriesRow {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "Intensity")]
    intensity: String,
}

/// Show the hourly cost/carbon series with its alignment coverage
pub async fn show_timeseries(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let series = client.timeseries().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&series)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let rows: Vec<SeriesRow> = series
                .points
                .iter()
                .map(|p| SeriesRow {
                    hour: p.hour.clone(),
                    cost: format_currency(p.cost_usd, "USD"),
                    co2: format_co2_g(p.co2_g),
                    intensity: match p.carbon_intensity {
                        Some(i) => format!("{:.0} g/kWh", i),
                        None => "-".to_string(),
                    },
                })
                .collect();

            print_table(&rows, OutputFormat::Table);

            match series.coverage {
                Some(coverage) => println!(
                    "Alignment coverage: {:.0}% ({} of {} hours)",
                    coverage * 100.0,
                    series.aligned_hours,
                    series.points.len()
                ),
                None => println!("{}", "No cost hours to align".dimmed()),
            }
        }
    }

    Ok(())
}
