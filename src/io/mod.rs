pub mod atomic;
pub mod config_io;
pub mod layout;
pub mod lock;
pub mod store_io;
