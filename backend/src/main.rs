#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedbase::start_server().await
}
