use clap::Parser;
use lister::cli::commands::Cli;
use lister::cli::handlers;
use lister::logging::{Verbosity, init_logging};

fn main() {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.verbose, cli.quiet));

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
