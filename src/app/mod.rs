pub mod ports;
pub mod search_debounce;
pub mod session;
pub mod snapshot;
