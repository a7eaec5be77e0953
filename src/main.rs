#[tokio::main]
async fn main() {
    fileman::cli::main().await;
}
