//! Named event streams and the catalog that hands out message identities.

mod catalog;
mod error;
mod stream;

pub use catalog::*;
pub use error::*;
pub use stream::*;

/// Messages a single cascade may deliver, the initial one included.
pub const DEFAULT_CASCADE_LIMIT: usize = 250;
