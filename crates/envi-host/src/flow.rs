//! Data entry flow results
//!
//! What a flow step hands back to the frontend: a form to fill in, a menu
//! to pick from, an entry to create, or an abort.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User input submitted to a step
pub type UserInput = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    Menu,
    CreateEntry,
    Abort,
}

/// Result of a flow step
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    /// Filled in by the flow manager
    pub flow_id: String,
    /// Integration domain, filled in by the flow manager
    pub handler: String,
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Always present, empty if the form has no fields
    pub data_schema: Vec<FormField>,
    /// Field name (or `base`) to error key or message
    pub errors: Option<HashMap<String, String>>,
    pub description_placeholders: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Entry data (config flow) or options (options flow) for create_entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserInput>,
    /// The created or updated config entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl FlowResult {
    fn empty(result_type: FlowResultType) -> Self {
        Self {
            flow_id: String::new(),
            handler: String::new(),
            result_type,
            step_id: None,
            data_schema: Vec::new(),
            errors: None,
            description_placeholders: None,
            menu_options: None,
            title: None,
            reason: None,
            data: None,
            result: None,
        }
    }

    pub fn form(step_id: impl Into<String>, data_schema: Vec<FormField>) -> Self {
        Self {
            step_id: Some(step_id.into()),
            data_schema,
            ..Self::empty(FlowResultType::Form)
        }
    }

    pub fn menu(step_id: impl Into<String>, options: &[&str]) -> Self {
        Self {
            step_id: Some(step_id.into()),
            menu_options: Some(options.iter().map(|o| o.to_string()).collect()),
            ..Self::empty(FlowResultType::Menu)
        }
    }

    pub fn create_entry(title: impl Into<String>, data: UserInput) -> Self {
        Self {
            title: Some(title.into()),
            data: Some(data),
            ..Self::empty(FlowResultType::CreateEntry)
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::empty(FlowResultType::Abort)
        }
    }

    /// Replace the errors; an empty map clears them
    pub fn with_errors(mut self, errors: HashMap<String, String>) -> Self {
        self.errors = if errors.is_empty() { None } else { Some(errors) };
        self
    }

    pub fn with_error(mut self, field: impl Into<String>, error: impl Into<String>) -> Self {
        self.errors
            .get_or_insert_with(HashMap::new)
            .insert(field.into(), error.into());
        self
    }

    pub fn with_placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.description_placeholders
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn is_form(&self) -> bool {
        self.result_type == FlowResultType::Form
    }

    /// Error for a field, if any
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|e| e.get(field))
            .map(String::as_str)
    }

    pub fn placeholder(&self, key: &str) -> Option<&str> {
        self.description_placeholders
            .as_ref()
            .and_then(|p| p.get(key))
            .map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.data_schema.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Password,
    Integer,
    Boolean,
    Select,
}

/// One choice of a select field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Form field schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FormField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            options: Vec::new(),
            description: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn password(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Password)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn select(name: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::new(name, FieldType::Select)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
