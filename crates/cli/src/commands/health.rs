//! Feed-health command

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_table, OutputFormat};

/// Row for the feed table
#[derive(Tabled, serde::Serialize)]
struct FeedRow {
    #[tabled(rename = "Feed")]
    feed: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Show per-feed health as reported by the daemon
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&health)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let mut rows: Vec<FeedRow> = health
                .feeds
                .iter()
                .map(|(name, feed)| FeedRow {
                    feed: name.clone(),
                    status: color_status(&feed.status),
                    detail: feed.message.clone().unwrap_or_default(),
                })
                .collect();
            rows.sort_by(|a, b| a.feed.cmp(&b.feed));

            print_table(&rows, OutputFormat::Table);
            println!("Overall: {}", color_status(&health.status));
        }
    }

    Ok(())
}
