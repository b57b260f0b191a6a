pub mod record_yaml;
pub mod template_yaml;

pub use record_yaml::{parse_record, serialize_record};
pub use template_yaml::{parse_template, serialize_template};
