//! Declarative form fields whose visibility and requiredness are plain
//! predicates over the sibling values.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::FieldErrors;

/// Form state keyed by field name.
pub type Values = BTreeMap<String, Value>;

pub type Predicate = fn(&Values) -> bool;

/// Value sent for a secret the user chose to supply at launch time.
pub const ASK: &str = "ASK";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Textarea,
    Email,
    Sensitive,
    Number,
    Checkbox,
    Select(&'static [(&'static str, &'static str)]),
    /// Id of a related resource picked from a lookup list.
    Lookup(&'static str),
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Key in the REST payload; defaults to `name`.
    pub api_field: Option<&'static str>,
    /// Nested payload object the field is written into, e.g. `inputs`.
    pub group: Option<&'static str>,
    pub visible: Option<Predicate>,
    pub required: Option<Predicate>,
    /// Adds a companion `<name>_ask` checkbox that sends [`ASK`] instead of a value.
    pub ask_at_runtime: bool,
    pub max_length: Option<usize>,
    pub help_text: Option<&'static str>,
    /// Read from the resource and validated, but never sent back.
    pub local: bool,
}

fn always(_: &Values) -> bool {
    true
}

impl FieldSchema {
    pub fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            api_field: None,
            group: None,
            visible: None,
            required: None,
            ask_at_runtime: false,
            max_length: None,
            help_text: None,
            local: false,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn sensitive(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Sensitive)
    }

    pub fn api(mut self, field: &'static str) -> Self {
        self.api_field = Some(field);
        self
    }

    pub fn group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    pub fn show_when(mut self, predicate: Predicate) -> Self {
        self.visible = Some(predicate);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = Some(always);
        self
    }

    pub fn required_when(mut self, predicate: Predicate) -> Self {
        self.required = Some(predicate);
        self
    }

    pub fn ask(mut self) -> Self {
        self.ask_at_runtime = true;
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn help(mut self, text: &'static str) -> Self {
        self.help_text = Some(text);
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    pub fn api_name(&self) -> &'static str {
        self.api_field.unwrap_or(self.name)
    }

    pub fn ask_flag(&self) -> String {
        format!("{}_ask", self.name)
    }

    pub fn is_visible(&self, values: &Values) -> bool {
        self.visible.is_none_or(|p| p(values))
    }

    pub fn is_required(&self, values: &Values) -> bool {
        self.is_visible(values) && self.required.is_some_and(|p| p(values)) && !self.is_asked(values)
    }

    pub fn is_asked(&self, values: &Values) -> bool {
        self.ask_at_runtime && values.get(&self.ask_flag()).and_then(Value::as_bool).unwrap_or(false)
    }
}

pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// `values[field]` as a string, empty when absent.
pub fn str_of<'a>(values: &'a Values, field: &str) -> &'a str {
    values.get(field).and_then(Value::as_str).unwrap_or_default()
}

pub fn truthy(values: &Values, field: &str) -> bool {
    match values.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

#[derive(Debug, Clone)]
pub struct FormSchema {
    pub name: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl FormSchema {
    pub fn new(name: &'static str, fields: Vec<FieldSchema>) -> Self {
        Self { name, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn visible_fields<'a>(&'a self, values: &'a Values) -> impl Iterator<Item = &'a FieldSchema> + 'a {
        self.fields.iter().filter(move |f| f.is_visible(values))
    }

    pub fn validate(&self, values: &Values) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in self.visible_fields(values) {
            let value = values.get(field.name);
            if field.is_required(values) && is_blank(value) {
                errors.insert(field.name.to_string(), "Please enter a value.".to_string());
                continue;
            }
            if let (Some(max), Some(Value::String(s))) = (field.max_length, value) {
                if s.chars().count() > max {
                    errors.insert(
                        field.name.to_string(),
                        format!("Maximum length is {} characters.", max),
                    );
                    continue;
                }
            }
            if field.kind == FieldKind::Email {
                if let Some(s) = value.and_then(Value::as_str).filter(|s| !s.is_empty()) {
                    if !s.contains('@') {
                        errors.insert(field.name.to_string(), "Please enter a valid email address.".to_string());
                    }
                }
            }
            if field.kind == FieldKind::Number && !is_blank(value) {
                let numeric = match value {
                    Some(Value::Number(_)) => true,
                    Some(Value::String(s)) => s.trim().parse::<f64>().is_ok(),
                    _ => false,
                };
                if !numeric {
                    errors.insert(field.name.to_string(), "Please enter a number.".to_string());
                }
            }
        }
        errors
    }

    /// Serializes visible fields into a REST payload. Hidden fields are never
    /// sent; blank values inside a group are dropped.
    pub fn to_payload(&self, values: &Values) -> Map<String, Value> {
        let mut payload = Map::new();
        for field in self.visible_fields(values).filter(|f| !f.local) {
            let value = if field.is_asked(values) {
                Value::String(ASK.to_string())
            } else {
                match values.get(field.name) {
                    Some(v) => normalize(field, v),
                    None => continue,
                }
            };

            match field.group {
                Some(group) => {
                    if is_blank(Some(&value)) {
                        continue;
                    }
                    let entry = payload
                        .entry(group.to_string())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(inner) = entry {
                        inner.insert(field.api_name().to_string(), value);
                    }
                }
                None => {
                    payload.insert(field.api_name().to_string(), value);
                }
            }
        }
        payload
    }

    /// Loads a REST resource back into form values. `ASK` secrets turn on
    /// their `_ask` checkbox.
    pub fn from_resource(&self, resource: &Value) -> Values {
        let mut values = Values::new();
        for field in &self.fields {
            let source = match field.group {
                Some(group) => resource.get(group).and_then(|g| g.get(field.api_name())),
                None => resource.get(field.api_name()),
            };
            let Some(value) = source else {
                continue;
            };
            if field.ask_at_runtime && value.as_str() == Some(ASK) {
                values.insert(field.ask_flag(), Value::Bool(true));
                values.insert(field.name.to_string(), Value::String(String::new()));
            } else {
                values.insert(field.name.to_string(), value.clone());
            }
        }
        values
    }
}

fn normalize(field: &FieldSchema, value: &Value) -> Value {
    match (field.kind, value) {
        (FieldKind::Number | FieldKind::Lookup(_), Value::String(s)) => match s.trim() {
            "" => Value::Null,
            t => t
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| t.parse::<f64>().map(Value::from))
                .unwrap_or_else(|_| value.clone()),
        },
        (FieldKind::Checkbox, v) => Value::Bool(match v {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty() && s != "false",
            _ => false,
        }),
        _ => value.clone(),
    }
}

pub fn values_from<I, K>(pairs: I) -> Values
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Helper for predicates: field equals one of `options`.
pub fn one_of(values: &Values, field: &str, options: &[&str]) -> bool {
    options.contains(&str_of(values, field))
}
