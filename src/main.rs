use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    build_reconcile_lib::run().await
}
