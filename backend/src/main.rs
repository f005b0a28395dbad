//! # Backend Service
//!
//! Thin entry point that delegates to lib-web for server setup.
//!
//! Bind address and CORS origins come from `BIND_ADDRESS` and
//! `ALLOWED_ORIGINS`; everything else is read by `lib_core::Config`.

use lib_web::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    start_server(ServerConfig::from_env()).await
}
