use clap::Parser;
use citychain::prelude::*;
use tracing_subscriber::EnvFilter;

/// Multiplayer city-chain game server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "5555")]
    port: u16,

    /// Only the player whose turn it is may name a city
    #[arg(long)]
    enforce_turns: bool,

    /// Longest display name accepted, in characters
    #[arg(long, default_value = "32")]
    max_name_len: usize,

    /// Most display names held at once
    #[arg(long, default_value = "256")]
    max_sessions: usize,
}

#[tokio::main]
async fn main() -> Result<(), CityChainError> {
    let args = Args::parse();

    // RUST_LOG overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let address = format!("{}:{}", args.host, args.port);
    let server = CityChainServer::builder()
        .bind(&address)
        .room_config(RoomConfig {
            enforce_turns: args.enforce_turns,
            ..RoomConfig::default()
        })
        .session_config(SessionConfig {
            max_name_len: args.max_name_len,
            max_sessions: args.max_sessions,
        })
        .build()
        .await?;

    tracing::info!(
        %address,
        enforce_turns = args.enforce_turns,
        "starting Citychain server"
    );
    server.run().await
}
