//! The `lookup` command: drive the full pipeline for one address.
//!
//! Stands in for the widget UI: configures the app, feeds the address
//! through the context, and renders whatever comes back on `CIVIC_INFO`
//! and `NOTICE` as text.

use anyhow::Context as _;
use std::time::Duration;
use voterinfo_app::App;
use voterinfo_config::AppConfig;
use voterinfo_core::civic::{CivicInfoResponse, PollingLocation};
use voterinfo_core::context::keys;
use voterinfo_core::notice::Notice;

/// How long to wait for a lookup to conclude, retries included.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(
    address: String,
    election_id: Option<String>,
    official_only: bool,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(election_id) = election_id {
        config.election_id = election_id;
    }
    if official_only {
        config.official_only = true;
    }
    if let Some(api_key) = api_key {
        config.api_key = Some(api_key);
    }
    if !config.has_api_key() {
        anyhow::bail!(
            "No API key configured. Set VOTERINFO_API_KEY or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        );
    }

    let app = App::new(config);
    app.init().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    app.context().subscribe(keys::CIVIC_INFO, move |new, _old| {
        let _ = tx.send(new.cloned());
    });

    app.configure_with_defaults();
    app.context().set(keys::ADDRESS, address.as_str());

    let civic_info = tokio::time::timeout(LOOKUP_TIMEOUT, rx.recv())
        .await
        .context("Timed out waiting for the lookup to complete")?
        .context("Lookup pipeline shut down unexpectedly")?;

    let notice = app
        .context()
        .get(keys::NOTICE)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value::<Notice>(v).ok());
    if let Some(notice) = &notice {
        println!("[{:?}] {}", notice.level, notice.title);
        println!("        {}", notice.desc);
    }

    match civic_info {
        Some(value) if !value.is_null() => {
            let response: CivicInfoResponse =
                serde_json::from_value(value).context("Malformed lookup result")?;
            print_response(&response);
            app.shutdown().await;
            Ok(())
        }
        _ => {
            app.shutdown().await;
            anyhow::bail!("Lookup failed");
        }
    }
}

fn print_response(response: &CivicInfoResponse) {
    if let Some(election) = &response.election {
        let name = election.name.as_deref().unwrap_or("Unknown election");
        match election.election_day.as_deref() {
            Some(day) => println!("{name} — {day}"),
            None => println!("{name}"),
        }
    }
    if let Some(input) = &response.normalized_input {
        println!("Address: {}", input.format(false, false));
    }

    print_locations("Polling locations", &response.polling_locations);
    print_locations("Early vote sites", &response.early_vote_sites);

    if !response.contests.is_empty() {
        println!("\nOn the ballot:");
        for contest in &response.contests {
            let office = contest.office.as_deref().unwrap_or("(unnamed contest)");
            println!("  {office}");
            for candidate in &contest.candidates {
                let name = candidate.name.as_deref().unwrap_or("(unnamed)");
                match candidate.party.as_deref() {
                    Some(party) => println!("    - {name} ({party})"),
                    None => println!("    - {name}"),
                }
            }
        }
    }
}

fn print_locations(label: &str, locations: &[PollingLocation]) {
    if locations.is_empty() {
        return;
    }
    println!("\n{label}:");
    for location in locations {
        if let Some(address) = &location.address {
            println!("  {}", address.format(false, false));
        } else if let Some(name) = &location.name {
            println!("  {name}");
        }
        if let Some(hours) = &location.polling_hours {
            println!("    Hours: {hours}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn notice_value_parses_back() {
        let value: Value = json!({
            "type": "warning",
            "title": "This data is for testing purposes only.",
            "desc": "Contact your local election official for complete voter information."
        });
        let notice: Notice = serde_json::from_value(value).unwrap();
        assert_eq!(notice.title, "This data is for testing purposes only.");
    }
}
