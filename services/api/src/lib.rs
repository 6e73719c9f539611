mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use release_gate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
