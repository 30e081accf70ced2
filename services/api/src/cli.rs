use crate::server;
use crate::tasks::{run_once, run_single};
use clap::{Args, Parser, Subcommand};
use homework_bot::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "homework-bot",
    about = "Hand out GitLab homework repositories to Recruitee candidates",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the webhook server and the poll trigger (default command)
    Serve(ServeArgs),
    /// Run one pass over all candidates in scope and print the summary
    Run,
    /// Process a single candidate now
    Process(ProcessArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Do not start the periodic poll trigger
    #[arg(long)]
    pub(crate) no_poll: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ProcessArgs {
    /// Recruitee candidate id
    pub(crate) candidate_id: u64,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run => run_once().await,
        Command::Process(args) => run_single(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["homework-bot"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn process_takes_a_numeric_candidate_id() {
        let cli = Cli::try_parse_from(["homework-bot", "process", "42"]).expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Process(ProcessArgs { candidate_id: 42 }))
        ));
        assert!(Cli::try_parse_from(["homework-bot", "process", "alice"]).is_err());
    }

    #[test]
    fn serve_accepts_overrides() {
        let cli = Cli::try_parse_from(["homework-bot", "serve", "--port", "8080", "--no-poll"])
            .expect("parses");
        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(8080));
        assert!(args.no_poll);
    }
}
