/// Database Module
///
/// The backend-facing half of uniql, split into two concerns:
/// - **Connection** (`connection.rs`): the traits a backend implements and
///   the raw results and errors it reports
/// - **Session** (`session.rs`): one open connection, its driver and its
///   transaction state
///
/// ## Error Handling
///
/// Backend errors are decoded by the session into `UniqlError` values; no
/// `BackendError` escapes this module's public session API.
pub mod connection;
pub mod session;

pub use connection::*;
pub use session::*;
