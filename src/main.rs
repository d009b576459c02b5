use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cms_policy_chat::run().await
}
