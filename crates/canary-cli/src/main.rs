//! canaryctl — roll a new instance template out to a managed instance group.
//!
//! # Usage
//!
//! ```text
//! canaryctl start --project my-proj --region us-central1 \
//!     --group web --template web-v2
//! ```

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(
    name = "canaryctl",
    about = "Health-gated canary rollouts for managed instance groups",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a template out to an instance group, doubling a canary until
    /// the whole group runs it.
    Start(commands::start::StartArgs),
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,canary=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result = match cli.command {
        Commands::Start(args) => commands::start::run(args).await,
    };

    if let Err(e) = result {
        error!("[FATAL] rollout aborted: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_start_with_region() {
        let cli = Cli::try_parse_from([
            "canaryctl",
            "start",
            "--project",
            "p",
            "--region",
            "us-central1",
            "--group",
            "web",
            "--template",
            "web-v2",
        ])
        .unwrap();

        let Commands::Start(args) = cli.command;
        assert_eq!(args.project, "p");
        assert_eq!(args.region.as_deref(), Some("us-central1"));
        assert_eq!(args.zone, None);
        assert!(!cli.log_json);
    }

    #[test]
    fn start_requires_group_and_template() {
        assert!(Cli::try_parse_from(["canaryctl", "start", "--project", "p"]).is_err());
    }
}
