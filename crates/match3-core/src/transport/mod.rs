//! Transport layer module.

pub mod host;
pub mod mock;
pub mod traits;

pub use host::{StdClock, WriterSerial};
pub use mock::{ManualClock, MockSerial};
pub use traits::{Clock, SerialPort, TransportError};
