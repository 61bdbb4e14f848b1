use clap::Parser;
use crudgen::cli::{run_cli, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = crudgen::logging::init(cli.log_format) {
        eprintln!("warning: {err:#}");
    }
    if let Err(err) = run_cli(cli) {
        tracing::error!(error = %format!("{err:#}"), "crudgen failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
