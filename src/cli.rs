use clap::Parser;

/// edge-authzd — out-of-band authorization decision service
#[derive(Parser)]
#[command(name = "edge-authzd", version, about)]
pub struct Cli {
    /// Port to bind. Overrides AUTHZ_PORT when set.
    #[arg(short, long)]
    pub port: Option<u16>,
}
