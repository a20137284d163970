// Identity module - Account addresses

mod address;

pub use address::{Address, AddressError, ADDRESS_LEN};
