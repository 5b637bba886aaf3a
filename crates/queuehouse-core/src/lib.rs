pub mod cursor;
pub mod error;
pub mod frame;

pub use cursor::{QueueEnd, ReadPosition};
pub use error::{Error, Result};
