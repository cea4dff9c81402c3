//! Configuration commands.

use crate::config::Config;

/// Print the loaded configuration in the requested format.
pub fn cmd_config_show(config: &Config, format: &str) -> anyhow::Result<()> {
    let rendered = match format.to_lowercase().as_str() {
        "json" => serde_json::to_string_pretty(config)?,
        "toml" => toml::to_string_pretty(config)?,
        "yaml" | "yml" => serde_yaml::to_string(config)?,
        other => anyhow::bail!("Unknown format '{}'. Use json, toml or yaml", other),
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
