use std::process::ExitCode;

use clap::Parser;
use projector_webctl::{cli::{self, DeviceArgs}, Direction};

#[derive(Parser)]
/// Power the projector off and wait until it reports OFF
struct Args {
    #[command(flatten)]
    device: DeviceArgs,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    cli::run_power("projector-off", Direction::PowerOff, &args.device)
}
