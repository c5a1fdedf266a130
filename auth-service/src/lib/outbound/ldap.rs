pub mod client;
pub mod config;
pub mod pool;
pub mod store;

pub use client::LdapDialer;
pub use config::LdapConfig;
pub use pool::ConnectionPool;
pub use pool::PoolError;
pub use store::LdapUserStore;
