// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  redpath — Redfish property retrieval tool
//
//  Data plane: monoio single-threaded event loop
//  Transport:  pooled keep-alive HTTP/1.1, optional TLS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::{Parser, Subcommand};
use redpath_core::ConnectPolicy;
use tracing::{debug, info};

mod orchestrate;

#[derive(Parser, Debug)]
#[command(name = "redpath", version, about = "Redfish property retrieval tool")]
struct Cli {
    /// Host to connect to
    #[arg(long)]
    host: String,

    /// Port to connect to (defaults to 443 with TLS, 80 without)
    #[arg(long)]
    port: Option<u16>,

    /// Username for HTTP Basic auth
    #[arg(long, default_value = "")]
    user: String,

    /// Password for HTTP Basic auth
    #[arg(long, default_value = "")]
    pass: String,

    /// Speak plain HTTP instead of TLS
    #[arg(long)]
    no_tls: bool,

    /// Skip server certificate verification
    #[arg(long)]
    no_verify_server: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch property values for one or more Redfish paths
    Get {
        /// Paths such as `Chassis[*]/Sensors`
        #[arg(required = true)]
        redpaths: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    let policy = ConnectPolicy {
        use_tls: !cli.no_tls,
        verify_server_certificate: !cli.no_verify_server,
    };

    let host = orchestrate::HostConnect {
        port: cli.port.unwrap_or_else(|| policy.default_port()),
        host: cli.host,
        username: cli.user,
        password: cli.pass,
    };

    let Command::Get { redpaths } = cli.command;

    let mut paths = Vec::with_capacity(redpaths.len());
    for raw in &redpaths {
        let path = redpath_core::parse_path(raw)
            .map_err(|e| anyhow::anyhow!("path {raw:?} was not valid: {e}"))?;
        debug!(path = %path, "Requested path");
        paths.push(path);
    }

    info!(
        host = %host.host,
        port = host.port,
        tls = policy.use_tls,
        paths = paths.len(),
        "redpath starting"
    );

    let mut rt = monoio::RuntimeBuilder::<monoio::FusionDriver>::new()
        .enable_all()
        .build()
        .expect("Failed to build monoio runtime");
    rt.block_on(orchestrate::run_get(policy, host, paths));

    Ok(())
}
