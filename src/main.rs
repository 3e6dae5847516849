#[tokio::main]
async fn main() -> anyhow::Result<()> {
    queueboard_lib::run().await
}
