//! Per-instance listing command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, Instance};
use crate::output::{color_status, format_opt, print_table, OutputFormat};

/// Row for the instance table
#[derive(Tabled, serde::Serialize)]
struct InstanceRow {
    #[tabled(rename = "Instance")]
    id: String,
    #[tabled(rename = "Type")]
    instance_type: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Runtime")]
    runtime: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Cost (EUR)")]
    cost: String,
    #[tabled(rename = "CO2")]
    co2: String,
    #[tabled(rename = "Quality")]
    quality: String,
}

fn to_row(instance: &Instance) -> InstanceRow {
    InstanceRow {
        id: instance.id.clone(),
        instance_type: instance.instance_type.clone(),
        state: color_status(&instance.state),
        region: instance.region.clone(),
        runtime: format_opt(instance.runtime_hours, "h"),
        cpu: format_opt(instance.cpu_utilization_pct, "%"),
        power: format_opt(instance.effective_power_watts, "W"),
        cost: format_opt(instance.cost_eur, ""),
        co2: format_opt(instance.total_co2_kg, "kg"),
        quality: color_status(&instance.data_quality),
    }
}

/// List enriched instances
pub async fn list_instances(
    client: &ApiClient,
    region: Option<String>,
    running_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let dashboard = client.dashboard().await?;

    let rows: Vec<InstanceRow> = dashboard
        .instances
        .iter()
        .filter(|i| region.as_deref().map(|r| i.region == r).unwrap_or(true))
        .filter(|i| !running_only || i.state == "running")
        .map(to_row)
        .collect();

    print_table(&rows, format);
    Ok(())
}
