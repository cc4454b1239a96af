use std::env;

use anyhow::Context;
use supportbot::plugins::PluginRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_BOT_TOKEN").context("DISCORD_BOT_TOKEN required")?;
    let app_id = env::var("DISCORD_APPLICATION_ID").context("DISCORD_APPLICATION_ID required")?;

    // Definitions come from the plugins themselves; all are guild-only
    let registry = PluginRegistry::load_plugins()?;
    let commands = registry.application_commands();

    let url = format!(
        "https://discord.com/api/v10/applications/{}/commands",
        app_id
    );

    let client = reqwest::Client::new();
    let res = client
        .put(&url)
        .header("Authorization", format!("Bot {}", token))
        .header("Content-Type", "application/json")
        .json(&commands)
        .send()
        .await?;

    if res.status().is_success() {
        println!("✅ Commands registered successfully!");
        let body: serde_json::Value = res.json().await?;
        println!(
            "Registered {} commands",
            body.as_array().map(|a| a.len()).unwrap_or(0)
        );
    } else {
        let status = res.status();
        let body = res.text().await?;
        eprintln!("❌ Failed to register commands: {} - {}", status, body);
    }

    Ok(())
}
