//! Command line plumbing shared by the `projector-*` binaries

use std::{io::IsTerminal, process::ExitCode, time::Duration};

use clap::Args;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    client::{describe_error, DeviceLink, HttpLink, ProjectorSession},
    endpoint::{DeviceEndpoint, DEFAULT_HOST},
    poll::{Clock, Direction, Outcome, SystemClock},
    status::PowerState,
};

/// Longest part of the matched declaration shown in debug output
const SNIPPET_LEN: usize = 300;

/// Options identifying the projector and how to talk to it
#[derive(Args, Debug, Clone, PartialEq)]
pub struct DeviceArgs {
    /// Projector IP address or hostname
    #[arg(value_name = "HOST")]
    host: Option<String>,

    /// Projector IP address or hostname (same as HOST)
    #[arg(long = "ip", conflicts_with = "host")]
    ip: Option<String>,

    /// Override status URL (default: http://<HOST>/info_data.htm)
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "5.0", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Print parsing and polling details to stderr
    #[arg(short = 'v', long = "debug", visible_alias = "verbose")]
    pub debug: bool,
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{e}"))
}

impl DeviceArgs {
    /// Host selected on the command line, or the factory default
    pub fn host(&self) -> &str {
        self.host.as_deref().or(self.ip.as_deref()).unwrap_or(DEFAULT_HOST)
    }

    /// Endpoint built from the host and the optional status URL override
    pub fn endpoint(&self) -> DeviceEndpoint {
        let endpoint = DeviceEndpoint::new(self.host());
        match &self.url {
            Some(url) => endpoint.with_status_url(url.clone()),
            None => endpoint,
        }
    }

    /// Open an HTTP session identifying itself as `tool`
    pub fn session(&self, tool: &str) -> Result<ProjectorSession<HttpLink>, crate::Error> {
        let user_agent = format!("{tool}/{}", env!("CARGO_PKG_VERSION"));
        ProjectorSession::new_from_http(self.endpoint(), self.timeout, &user_agent)
    }
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over `debug`.
pub fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("projector_webctl={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Read the state once. Fetch and parse failures read as [`PowerState::Unknown`].
pub fn query_status<L: DeviceLink>(session: &mut ProjectorSession<L>) -> PowerState {
    match session.status_report() {
        Ok(report) => {
            if let Some(declaration) = &report.declaration {
                let snippet: String = declaration.chars().take(SNIPPET_LEN).collect();
                debug!("matched: {snippet}");
            }
            debug!(
                items = ?report.items,
                "first={:?} -> normalized={}",
                report.token(),
                report.state
            );
            report.state
        }
        Err(e) => {
            debug!("fetch error: {}", describe_error(&e));
            PowerState::Unknown
        }
    }
}

/// Entry point of the query binary: print the state and exit with its code
pub fn run_query(tool: &str, args: &DeviceArgs) -> ExitCode {
    init_logging(args.debug);
    debug!(url = %args.endpoint().status_url, "querying status");

    let state = match args.session(tool) {
        Ok(mut session) => query_status(&mut session),
        Err(e) => {
            debug!("client setup failed: {}", describe_error(&e));
            PowerState::Unknown
        }
    };

    println!("{state}");
    ExitCode::from(state.exit_code())
}

/// Drive the projector toward `direction` and print the result
pub fn power<L, C>(
    session: &mut ProjectorSession<L>,
    clock: &mut C,
    direction: Direction,
) -> Outcome
where
    L: DeviceLink,
    C: Clock + ?Sized,
{
    let target = direction.target();
    let outcome = session.set_power_with_clock(direction, clock);
    match outcome {
        Outcome::AlreadySatisfied => println!("Projector already {target}."),
        Outcome::Converged { .. } => println!("Projector is now {target}."),
        Outcome::TimedOut { last, .. } => {
            println!("Timeout waiting for projector to power {target} (last status: {last}).")
        }
    }
    outcome
}

/// Entry point of the power-on and power-off binaries
pub fn run_power(tool: &str, direction: Direction, args: &DeviceArgs) -> anyhow::Result<ExitCode> {
    init_logging(args.debug);

    let mut session = args.session(tool)?;
    info!("checking projector {} status", args.host());

    let outcome = power(&mut session, &mut SystemClock, direction);
    Ok(ExitCode::from(outcome.exit_code()))
}
