use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = sproxy::cli::Cli::parse();
    // Failures are already logged as structured records.
    if sproxy::run::execute(cli).await.is_err() {
        std::process::exit(1);
    }
}
