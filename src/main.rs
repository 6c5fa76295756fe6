use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use simple_logger::init_with_level;

use cisreg::cli::{run, Args};

fn main() -> ExitCode {
    let args = Args::parse();

    init_with_level(args.level).unwrap_or_else(|e| panic!("{}", e));
    info!("Starting cisreg with args: {}", args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
