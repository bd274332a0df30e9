//! Protocol-level types shared by the codec and the connection loop.

mod error;

pub use error::{HttpError, ParseError, SendError};
