use clap::Parser;

use material_replacer::app::{self, Args};

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    if let Err(err) = app::run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
