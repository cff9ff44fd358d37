use blink::cli;
use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    if let Err(err) = cli::dispatch(cli) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
