#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobtap_app::run().await
}
