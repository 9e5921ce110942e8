use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{server, Config, Result};
use std::net::SocketAddr;

/// Runs the HTTP server until it receives Ctrl-C. `bind` overrides the address from
/// `config.json`.
pub async fn serve(config: Config, bind: Option<SocketAddr>) -> Result<Out<()>> {
    let bind = bind.unwrap_or_else(|| config.bind());
    server::run(config, bind)
        .await
        .pub_result(ErrorType::Service)?;
    Ok("Server stopped".into())
}
