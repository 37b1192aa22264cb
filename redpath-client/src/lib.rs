pub mod client;
pub mod connection;
pub mod pool;
pub mod request;
pub mod tls;

pub use client::Client;
pub use pool::{CHANNEL_CAPACITY, ConnectionPool, MAX_POOL_SIZE, MAX_REQUEST_QUEUE};
pub use request::{HttpRequest, PendingRequest, Response, ResponseCallback};
