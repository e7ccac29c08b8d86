mod config;
mod dispatcher;
mod env;
mod error;
mod packet;
mod persist;
mod routes;
mod session;

pub use config::DispatchConfig;
pub use dispatcher::{DispatchError, Dispatcher};
pub use env::Env;
pub use routes::{router, AppState};
