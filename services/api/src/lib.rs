mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use count_connect::error::AppError;

/// Parse the command line and dispatch to the server or the demo walkthrough.
pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
