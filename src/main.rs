use clap::Parser;
use rectiplot::cli::{self, Args};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .init();
    cli::run(args)
}
