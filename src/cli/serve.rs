use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use super::ModelArgs;
use crate::server::{self, AppState};

pub async fn run(args: ModelArgs, bind: Option<String>) -> Result<()> {
    let mut config = args.load_config()?;
    if let Some(bind) = bind {
        info!("CLI override: bind = {}", bind);
        config.server.bind = bind;
    }

    let generator = args.build_generator(&config)?;
    let state = AppState::new(generator, &config.server);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;

    server::serve(state, listener).await
}
