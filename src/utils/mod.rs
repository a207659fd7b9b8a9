pub mod address;
pub mod balance;
pub mod display;
pub mod sync;
