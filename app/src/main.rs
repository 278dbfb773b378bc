use std::process::ExitCode;

use clap::Parser;
use yosemite_app::{App, Args};

fn main() -> ExitCode {
    let args = Args::parse();

    match App::run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
