use std::process;

#[tokio::main]
async fn main() {
    let exit_code = shibwalk_cli::run().await;
    process::exit(exit_code);
}
