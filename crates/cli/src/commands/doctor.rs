//! The `doctor` command: check the local configuration.

use voterinfo_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = AppConfig::load()?;

    println!("Config file:  {}", config_path.display());
    println!("API base:     {}", config.api_base);
    println!("Election id:  {}", config.election_id);
    println!("Official only: {}", config.official_only);
    println!("Country:      {}", config.country);
    println!(
        "API key:      {}",
        if config.has_api_key() {
            "configured"
        } else {
            "MISSING (set VOTERINFO_API_KEY)"
        }
    );

    if let Err(err) = config.validate() {
        println!("\nConfiguration problem: {err}");
    } else if !config.has_api_key() {
        println!("\nLookups will fail until an API key is configured.");
    } else {
        println!("\nConfiguration looks good.");
    }

    Ok(())
}
