//! Scene Kit - Demo Entry Point
//!
//! Runs a headless user info scene against the platform preference storage.

use scene_kit::app::application::run_demo;
use scene_kit::helpers::is_development;

fn main() -> anyhow::Result<()> {
    let level = if is_development() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    tracing::info!("Starting scene-kit demo...");

    run_demo()
}
