use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use supportbot::config::Config;
use supportbot::discord::client::DiscordClient;
use supportbot::discord::gateway::run_member_listener;
use supportbot::plugins::PluginRegistry;
use supportbot::storage::db::create_pool;
use supportbot::{create_app, AppState, VERSION};

fn print_banner(addr: &SocketAddr, commands: &[&str], gateway: bool) {
    let display_host = if addr.ip().is_unspecified() {
        "localhost"
    } else {
        &addr.ip().to_string()
    };
    println!();
    println!("  \x1b[36m╔══════════════════════════════════════════╗\x1b[0m");
    println!("  \x1b[36m║\x1b[0m  \x1b[1;35m🤖 supportbot\x1b[0m                           \x1b[36m║\x1b[0m");
    println!("  \x1b[36m║\x1b[0m  \x1b[90mroll · giphy · whois · notes\x1b[0m            \x1b[36m║\x1b[0m");
    println!("  \x1b[36m╚══════════════════════════════════════════╝\x1b[0m");
    println!();
    println!(
        "  \x1b[32m→\x1b[0m Server running at \x1b[1;4mhttp://{}:{}\x1b[0m",
        display_host,
        addr.port()
    );
    println!("  \x1b[32m→\x1b[0m Version: \x1b[33m{}\x1b[0m", VERSION);
    println!("  \x1b[32m→\x1b[0m Commands: \x1b[33m{}\x1b[0m", commands.join(", "));
    println!(
        "  \x1b[32m→\x1b[0m Gateway: \x1b[33m{}\x1b[0m",
        if gateway { "member joins" } else { "disabled" }
    );
    println!();
    println!("  \x1b[90mEndpoints:\x1b[0m");
    println!("    \x1b[32mGET \x1b[0m /                  \x1b[90m← Health check\x1b[0m");
    println!("    \x1b[32mGET \x1b[0m /health             \x1b[90m← JSON status\x1b[0m");
    println!("    \x1b[34mPOST\x1b[0m /webhooks/discord  \x1b[90m← Discord interactions\x1b[0m");
    println!();
    println!("  \x1b[90mPress Ctrl+C to stop\x1b[0m");
    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let discord = Arc::new(DiscordClient::new(
        &config.discord_bot_token,
        config.discord_application_id,
    ));
    let plugins = PluginRegistry::load_plugins()?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let gateway = config.gateway_enabled;
    let state = AppState::new(config, pool, discord, plugins)?;

    if gateway {
        tokio::spawn(run_member_listener(state.clone()));
    } else {
        info!("Gateway listener disabled");
    }

    let commands = state.plugins.command_names();
    print_banner(&addr, &commands, gateway);

    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
