mod api;
mod app;
mod core;
mod data;
mod domain;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::CoreApp::run().await
}
