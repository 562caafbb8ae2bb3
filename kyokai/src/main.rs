#[macro_use]
extern crate tracing;

use clap::Parser;
use color_eyre::eyre;
use kyokai_config::Configuration;
use std::path::PathBuf;
use uuid::Uuid;

/// Kyokai community client core
#[derive(Parser)]
#[command(about, author, version)]
struct Args {
    /// Path to the configuration file
    #[clap(long, short)]
    config: PathBuf,
}

async fn boot() -> eyre::Result<()> {
    let args = Args::parse();
    let config = Configuration::load(args.config).await?;
    kyokai::observability::initialise()?;

    let state = kyokai::prepare_state(&config);
    let viewer = Uuid::now_v7();
    state
        .sign_in(viewer)
        .await
        .map_err(kyokai_error::Error::into_error)?;

    info!(
        %viewer,
        unread = state.service.notification.unread_count(),
        "session ready"
    );
    for view in state.service.forum.posts() {
        info!(title = %view.post.title, likes = view.post.like_count, "post");
    }

    tokio::signal::ctrl_c().await?;
    state.sign_out();

    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(boot())
}
