use std::process::ExitCode;

use clap::Parser;
use projector_webctl::cli::{self, DeviceArgs};

#[derive(Parser)]
/// Query the projector power state.
///
/// Exit codes: 0 = ON, 2 = OFF, 3 = COOLING, 4 = UNKNOWN or network error
struct Args {
    #[command(flatten)]
    device: DeviceArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    cli::run_query("projector-query", &args.device)
}
