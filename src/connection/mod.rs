mod config;
mod connection;
mod io;
mod state;

pub use config::*;
pub use connection::*;
pub use io::*;
pub use state::*;
