//! `finishcam sessions`: print a session directory.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use finishcam_core::SessionLocation;
use finishcam_core::views::{SessionSummary, select_embedded, summarize};
use finishcam_protocol::SessionIndex;

use crate::config::ClientConfig;
use crate::fetch::Fetcher;

pub async fn list_sessions(
    config: &ClientConfig,
    url: &str,
    embedded: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let directory = SessionLocation::parse(url)?;
    let fetcher = Fetcher::new(config.request_timeout()).context("building HTTP client")?;
    let body = fetcher
        .get(directory.metadata_uri().clone())
        .await
        .with_context(|| format!("fetching {}", directory.metadata_uri()))?;
    let index = SessionIndex::from_slice(&body)
        .with_context(|| format!("parsing {}", directory.metadata_uri()))?;

    let offset = config.offset();
    let rows = summarize(&index, offset, Utc::now().with_timezone(&offset));
    let selected = embedded.and_then(|json| select_embedded(&index, json));
    write_table(&rows, selected.as_deref(), out)?;
    if let Some(key) = selected {
        writeln!(out, "\nselected session: {}", directory.child(&key)?.base())?;
    }
    Ok(())
}

fn write_table(
    rows: &[SessionSummary],
    selected: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(
        out,
        "  {:<24} {:<10} {:<8} {:<8} {:>6}",
        "Session", "Date", "From", "To", "Images"
    )?;
    for row in rows {
        let marker = if selected == Some(row.key.as_str()) { '*' } else { ' ' };
        writeln!(
            out,
            "{marker} {:<24} {:<10} {:<8} {:<8} {:>6}{}",
            row.key,
            row.time_start.format("%Y-%m-%d").to_string(),
            row.time_start.format("%H:%M:%S").to_string(),
            row.time_end.format("%H:%M:%S").to_string(),
            row.image_count,
            if row.live { "  Live!" } else { "" },
        )?;
    }
    Ok(())
}
