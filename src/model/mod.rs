pub mod config;
pub mod record;
pub mod template;

pub use config::*;
pub use record::*;
pub use template::*;
