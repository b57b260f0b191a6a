use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reserved record key holding the completion flag
pub const CHECKED_KEY: &str = "checked";

/// The kind of a template field, with its own validation strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    /// `YYYY-MM-DD`
    Date,
    /// One of a fixed, ordered set of values
    Category(Vec<String>),
}

impl FieldType {
    /// Name used in template files
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Text => "Text",
            FieldType::Number => "Number",
            FieldType::Date => "Date",
            FieldType::Category(_) => "Category",
        }
    }

    /// Which kind of input widget a UI should offer for this field
    pub fn input_hint(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Category(_) => "category",
        }
    }

    /// Check a non-blank value against this field type.
    /// Blank values are always accepted here; the primary-field rule is
    /// enforced by the record store.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }
        match self {
            FieldType::Text => Ok(()),
            FieldType::Number => match value.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(format!("'{}' is not a number", value)),
            },
            FieldType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| format!("'{}' is not a YYYY-MM-DD date", value)),
            FieldType::Category(categories) => {
                if categories.iter().any(|c| c == value) {
                    Ok(())
                } else {
                    Err(format!(
                        "'{}' is not one of: {}",
                        value,
                        categories.join(", ")
                    ))
                }
            }
        }
    }
}

/// One declared field of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldDefFile", into = "FieldDefFile")]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDef {
            name: name.into(),
            field_type,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        FieldDef::new(name, FieldType::Text)
    }
}

/// On-disk shape of a field descriptor: `{field_name, type, categories?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldDefFile {
    field_name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<String>>,
}

impl TryFrom<FieldDefFile> for FieldDef {
    type Error = String;

    fn try_from(raw: FieldDefFile) -> Result<Self, Self::Error> {
        let field_type = match raw.field_type.as_str() {
            "Text" => FieldType::Text,
            "Number" => FieldType::Number,
            "Date" => FieldType::Date,
            "Category" => FieldType::Category(raw.categories.unwrap_or_default()),
            other => return Err(format!("unknown field type '{}'", other)),
        };
        Ok(FieldDef {
            name: raw.field_name,
            field_type,
        })
    }
}

impl From<FieldDef> for FieldDefFile {
    fn from(def: FieldDef) -> Self {
        let field_type = def.field_type.type_name().to_string();
        let categories = match def.field_type {
            FieldType::Category(categories) => Some(categories),
            _ => None,
        };
        FieldDefFile {
            field_name: def.name,
            field_type,
            categories,
        }
    }
}

/// A named schema. The first field is the primary field (the display title).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl Template {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Template {
            name: name.into(),
            fields,
        }
    }

    pub fn primary_field(&self) -> Option<&FieldDef> {
        self.fields.first()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Structural checks on the field list. Returns the reason on failure.
    pub fn check_fields(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("a template needs at least one field".into());
        }
        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(format!("field {} has an empty name", i + 1));
            }
            if field.name == CHECKED_KEY {
                return Err(format!("'{}' is a reserved field name", CHECKED_KEY));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(format!("duplicate field '{}'", field.name));
            }
            if let FieldType::Category(categories) = &field.field_type
                && categories.is_empty()
            {
                return Err(format!("category field '{}' has no categories", field.name));
            }
        }
        Ok(())
    }
}

/// Check that a name can be used as a template/list directory name.
pub fn check_list_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("name cannot be empty");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("name cannot contain path separators");
    }
    if name.starts_with('.') {
        return Err("name cannot start with '.'");
    }
    Ok(())
}
