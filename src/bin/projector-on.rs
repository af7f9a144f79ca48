use std::process::ExitCode;

use clap::Parser;
use projector_webctl::{cli::{self, DeviceArgs}, Direction};

#[derive(Parser)]
/// Power the projector on and wait until it reports ON
struct Args {
    #[command(flatten)]
    device: DeviceArgs,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    cli::run_power("projector-on", Direction::PowerOn, &args.device)
}
