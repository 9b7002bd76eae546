use std::process;

#[tokio::main]
async fn main() {
    process::exit(azblob_upload::cli::run().await);
}
