//! OSCORE implementation.

mod algorithm;
mod context;
#[cfg_attr(tarpaulin, skip)]
mod error;
mod replay;
#[cfg(test)]
mod test_vectors;
mod util;

pub use algorithm::{AeadAlgorithm, HashFunction};
pub use context::{Parameters, RequestId, SecurityContext};
pub use error::Error;
pub use replay::ReplayWindow;
pub use util::has_option;

/// The result type for the `oscore` module.
pub type Result<T> = core::result::Result<T, Error>;
