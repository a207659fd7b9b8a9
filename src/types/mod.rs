pub mod error;

pub use error::{AddressError, AmountError, EngineError, SeedError};
