use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod criteria;
pub mod output;
#[macro_use]
mod test_macros;
use cli::Args;

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(debug: bool) {
    let default_directives = if debug { "warn,db=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut db = args.open_database()?;
    debug!(database = %db, "resolved database");
    let output = args.command.run(&mut db, args.format)?;
    println!("{}", output);
    Ok(())
}
