use clap::Parser;
use monthly_finances::args::{Args, Command};
use monthly_finances::{commands, Config, ErrorType, IntoResult, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().finances_home().path();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.max_upload_mb(), init_args.bind())
                .await?
                .print()
        }

        Command::Serve(serve_args) => commands::serve(load(home).await?, serve_args.bind())
            .await?
            .print(),

        Command::Upload(upload_args) => commands::upload_file(
            load(home).await?,
            upload_args.user_id(),
            upload_args.year(),
            upload_args.file(),
        )
        .await?
        .print(),

        Command::Show(show_args) => {
            let out = commands::show(load(home).await?, show_args.user_id(), show_args.year())
                .await?;
            match out.structure_json() {
                Some(json) if show_args.json() => println!("{json}"),
                _ => out.print(),
            }
        }
    };
    Ok(())
}

async fn load(home: &std::path::Path) -> Result<Config> {
    Config::load(home).await.pub_result(ErrorType::Config)
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
