//! Port 0 transport: links, the transaction driver and shared access

mod driver;
mod link;
mod serial;
mod shared;

pub use driver::{
    DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT, Driver, DriverConfig, TransactionState, transact,
};
pub use link::{Link, MAX_FRAME_LEN, read_frame};
#[cfg(feature = "serial")]
pub use serial::SerialLink;
pub use serial::{Parity, SOCKET_SCHEME, SerialSettings, TcpLink, open_link};
pub use shared::SharedStream;
