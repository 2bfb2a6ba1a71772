use crate::demo::{run_batch, run_demo, run_schema, run_score, BatchArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use churn_guard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Churn Guard",
    about = "Score telecom customers for churn risk from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single customer record read from a JSON file or stdin
    Score(ScoreArgs),
    /// Score a CSV export and optionally write per-row results
    Batch(BatchArgs),
    /// Print the attribute schema the encoder enforces
    Schema,
    /// Score three reference customers against a built-in model
    Demo,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Batch(args) => run_batch(args),
        Command::Schema => run_schema(),
        Command::Demo => run_demo(),
    }
}
