mod cli;
mod infra;
mod poller;
mod routes;
mod server;
mod tasks;

use homework_bot::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
