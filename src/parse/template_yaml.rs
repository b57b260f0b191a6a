use indexmap::IndexMap;

use crate::model::template::{FieldDef, Template};

/// Parse a template file: a single-key mapping from the template name to
/// its ordered field descriptors. Returns the reason on failure.
pub fn parse_template(name: &str, text: &str) -> Result<Template, String> {
    let mut doc: IndexMap<String, Vec<FieldDef>> =
        serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    if doc.len() != 1 {
        return Err(format!("expected one template entry, found {}", doc.len()));
    }
    let fields = doc
        .shift_remove(name)
        .ok_or_else(|| format!("file does not define '{}'", name))?;
    Ok(Template::new(name, fields))
}

pub fn serialize_template(template: &Template) -> Result<String, serde_yaml::Error> {
    let mut doc = IndexMap::with_capacity(1);
    doc.insert(template.name.as_str(), &template.fields);
    serde_yaml::to_string(&doc)
}
