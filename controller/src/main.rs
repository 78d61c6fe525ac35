#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    hotwater_controller::host::run().await
}
