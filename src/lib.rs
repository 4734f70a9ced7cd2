use std::net::SocketAddr;

pub mod adapters;
pub mod app;
pub mod config;
pub mod notify;
pub mod ports;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use notify::{VapidCredentials, generate_vapid_credentials};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config)).await.expect("server error");
}
