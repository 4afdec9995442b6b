//! Grid carbon-intensity command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_warning, OutputFormat};

/// Show the headline grid intensity
pub async fn show_carbon(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let dashboard = client.dashboard().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&dashboard.carbon)?;
            println!("{}", json);
        }
        OutputFormat::Table => match &dashboard.carbon {
            Some(carbon) => {
                println!("{}", "Grid Carbon Intensity".bold());
                println!("{}", "=".repeat(50));
                println!("Zone:                   {}", carbon.zone.cyan());
                println!(
                    "Intensity:              {:.0} gCO2/kWh",
                    carbon.intensity_g_per_kwh
                );
                println!("Source:                 {}", color_status(&carbon.source));
                println!("Recorded at:            {}", carbon.recorded_at.dimmed());
                if carbon.source == "stale_cache" {
                    print_warning("Live feed unavailable; showing an expired cached reading");
                }
            }
            None => {
                print_info("No carbon-intensity reading available");
            }
        },
    }

    Ok(())
}
