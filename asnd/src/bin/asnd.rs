use anyhow::Context as _;
use asnd::{Config, Context, Server};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(StructOpt, Debug)]
struct Args {
    /// maximum level of the logs, `debug` also logs every unit handled
    #[structopt(long = "log-level", default_value = "info")]
    log_level: Level,

    /// path of the configuration file of the server
    #[structopt(long = "config")]
    config: Option<PathBuf>,

    /// print the example configuration to the standard output and exit
    #[structopt(long = "default-config")]
    default_config: bool,
}

#[tokio::main]
async fn main() {
    if let Err(error) = main_run().await {
        eprintln!("{:?}", error);
        std::process::exit(1);
    }
}

async fn main_run() -> anyhow::Result<()> {
    let args = Args::from_args();

    if args.default_config {
        println!("{}", Config::EXAMPLE);
        return Ok(());
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let path = args
        .config
        .context("--config is required to start the server")?;
    let config = Config::from_file(path).context("cannot load initial settings")?;

    let server = Server::new(Context::new(config)).context("Cannot start the server")?;

    tokio::select! {
        result = server.serve() => {
            result.context("The server stopped")?
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("stopping the server on CTRL-C")
        }
    }

    Ok(())
}
