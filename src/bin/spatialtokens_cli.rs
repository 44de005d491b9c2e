//! SpatialTokens CLI - resolve, compile and serve design tokens
//!
//! Commands: detect, resolve, compile, serve-route, watch
//! Outputs JSON (or the requested rendering) to stdout, logs to stderr
//! Returns non-zero when setup fails

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use spatialtokens_core::{
    compile,
    logging::{init_logging, LogConfig, LogFormat},
    CssFileSurface, DesignState, DeviceDetector, EdgeHandler, EdgeRequest, HostSignals,
    HttpTransport, OfflineTransport, Settings, StateController, TokenResolver,
    TokenStore, Transport,
};

#[derive(Parser)]
#[command(name = "spatialtokens-cli")]
#[command(about = "SpatialTokens CLI - Adaptive Design-Token Resolution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (JSON). Missing file means defaults.
    #[arg(short, long, default_value = "spatialtokens.json")]
    config: PathBuf,

    /// Token store file replacing the built-in one
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Never contact remote endpoints
    #[arg(long)]
    offline: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Colorize compact log output
    #[arg(long)]
    color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect hardware capabilities and the recommended state
    Detect {
        /// Override the detected platform string
        #[arg(long)]
        platform: Option<String>,

        /// Override the detected logical core count
        #[arg(long)]
        cores: Option<usize>,
    },

    /// Resolve tokens for a state and report where they came from
    Resolve {
        #[arg(short, long, default_value = "transitional")]
        state: String,
    },

    /// Resolve and compile tokens into style variables
    Compile {
        #[arg(short, long, default_value = "transitional")]
        state: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Css)]
        format: OutputFormat,
    },

    /// Answer one request the way the token service would
    ServeRoute {
        /// Path with optional query, e.g. /design-system/tokens?state=quantum
        #[arg(short, long)]
        path: String,

        #[arg(long, default_value = "GET")]
        method: String,

        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Keep a CSS file in sync while stepping through states
    Watch {
        /// CSS file to maintain
        #[arg(short, long)]
        out: PathBuf,

        /// States to apply in order after startup
        #[arg(long, value_delimiter = ',')]
        states: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Css,
    Liquid,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_ansi(cli.color);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let settings = Settings::load_or_default(&cli.config);

    let store = match load_store(cli.tokens.as_deref()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            println!(r#"{{"success": false, "error": "Failed to load tokens: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    let transport: Arc<dyn Transport> = if cli.offline {
        Arc::new(OfflineTransport)
    } else {
        match HttpTransport::new() {
            Ok(t) => Arc::new(t),
            Err(e) => {
                println!(r#"{{"success": false, "error": "{}"}}"#, e);
                return ExitCode::FAILURE;
            }
        }
    };

    match cli.command {
        Commands::Detect { platform, cores } => {
            let mut signals = HostSignals::from_environment();
            if let Some(platform) = platform {
                signals.platform = platform;
            }
            if let Some(cores) = cores {
                signals.logical_cores = cores;
            }

            let detector = detector(signals, &settings, transport, cli.offline);
            emit(&detector.detect().await)
        }

        Commands::Resolve { state } => {
            let resolver = TokenResolver::new(transport, store, &settings);
            let resolution = resolver
                .resolve_with_provenance(DesignState::parse_lossy(&state))
                .await;
            emit(&resolution)
        }

        Commands::Compile { state, format } => {
            let resolver = TokenResolver::new(transport, store, &settings);
            let tokens = resolver.resolve_named(&state).await;
            let block = compile(&tokens);

            match format {
                OutputFormat::Css => print!("{}", block.to_css(&settings.css_selector)),
                OutputFormat::Liquid => print!("{}", block.to_liquid()),
                OutputFormat::Json => {
                    return emit(&serde_json::json!({
                        "state": DesignState::parse_lossy(&state),
                        "fingerprint": block.fingerprint(),
                        "variables": block,
                    }))
                }
            }
            ExitCode::SUCCESS
        }

        Commands::ServeRoute {
            path,
            method,
            user_agent,
        } => {
            let mut request = EdgeRequest::get(&path);
            request.method = method.to_ascii_uppercase();
            request.user_agent = user_agent;

            let response = EdgeHandler::new(store).handle(&request);
            let success = response.status < 400;
            let code = emit(&response);
            if success {
                code
            } else {
                ExitCode::from(2) // Route rejected the request
            }
        }

        Commands::Watch { out, states } => {
            let detector = detector(
                HostSignals::from_environment(),
                &settings,
                transport.clone(),
                cli.offline,
            );
            let resolver = Arc::new(TokenResolver::new(transport, store, &settings));
            let controller =
                StateController::start(settings.initial_request(), resolver, &detector).await;

            let surface = Arc::new(CssFileSurface::new(&out, settings.css_selector.clone()));
            let sync = controller.attach_surface(surface);

            let mut applied = vec![controller.state()];
            for name in &states {
                controller.set_state(DesignState::parse_lossy(name)).await;
                applied.push(controller.state());
            }

            let current = controller.current();
            drop(controller);
            if let Err(e) = sync.await {
                println!(r#"{{"success": false, "error": "Surface task failed: {}"}}"#, e);
                return ExitCode::FAILURE;
            }

            emit(&serde_json::json!({
                "success": true,
                "out": out,
                "applied": applied,
                "state": current.state,
                "generation": current.generation,
                "fingerprint": current.variables.fingerprint(),
            }))
        }
    }
}

fn load_store(path: Option<&Path>) -> Result<TokenStore, spatialtokens_core::StoreError> {
    match path {
        Some(path) => TokenStore::load_from_path(path),
        None => TokenStore::embedded(),
    }
}

fn detector(
    signals: HostSignals,
    settings: &Settings,
    transport: Arc<dyn Transport>,
    offline: bool,
) -> DeviceDetector {
    let detector = DeviceDetector::local(signals);
    if offline || !settings.probe_capabilities {
        return detector;
    }
    detector.with_probe(transport, &settings.primary_endpoint, settings.capability_timeout())
}

fn emit(value: &impl Serialize) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!(r#"{{"success": false, "error": "{}"}}"#, e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_states_split_on_commas() {
        let cli = Cli::try_parse_from([
            "spatialtokens-cli",
            "--offline",
            "watch",
            "--out",
            "tokens.css",
            "--states",
            "heritage,quantum",
        ])
        .unwrap();

        assert!(cli.offline);
        assert!(!cli.color);
        match cli.command {
            Commands::Watch { states, .. } => assert_eq!(states, ["heritage", "quantum"]),
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_color_flag_reaches_log_config() {
        let cli = Cli::try_parse_from(["spatialtokens-cli", "--color", "-vv", "detect"]).unwrap();
        let config = LogConfig::from_verbosity(cli.verbose)
            .with_format(cli.log_format)
            .with_ansi(cli.color);
        assert!(config.with_ansi);
        assert_eq!(config.level, tracing::Level::DEBUG);
    }
}
