use std::process::ExitCode;

use pharma_ledger::app;

#[tokio::main]
async fn main() -> ExitCode {
    match app::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pharma-ledger: {err}");
            ExitCode::FAILURE
        }
    }
}
