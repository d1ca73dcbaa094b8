pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod instrument;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use coordinator::*;
pub use error::*;
pub use instrument::*;
pub use protocol::*;
pub use routes::*;
pub use server::*;
pub use state::*;
