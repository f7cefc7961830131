use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::api::client::ApiClient;
use crate::api::endpoints::ResourceKind;
use crate::api::models::Id;
use crate::error::{ApiError, ConsoleError, ErrorMessage, FieldErrors, Result};
use crate::forms::schema::{FieldKind, FormSchema, Values};

/// Where the console goes after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    /// Force the target screen to refetch instead of reusing cached state.
    pub reload: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(Id),
}

/// What a resource form needs beyond its field schema.
pub trait ResourceSpec: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn schema(&self) -> &FormSchema;

    fn create_path(&self) -> String {
        self.kind().list_path()
    }

    fn update_path(&self, id: Id) -> String {
        self.kind().detail_path(id)
    }

    fn read_path(&self, id: Id) -> String {
        self.kind().detail_path(id)
    }

    /// Console route of the detail screen.
    fn detail_route(&self, id: Id) -> String {
        format!("/{}/{}", self.kind().segment(), id)
    }

    fn to_payload(&self, values: &Values) -> Result<Map<String, Value>> {
        Ok(self.schema().to_payload(values))
    }

    fn from_resource(&self, resource: &Value) -> Result<Values> {
        Ok(self.schema().from_resource(resource))
    }

    /// Called once a lookup field points at `related`, so dependent values
    /// can follow it.
    fn lookup_resolved(&self, _field: &str, _related: &Value, _values: &mut Values) {}
}

/// Add/edit controller shared by every resource screen.
pub struct ResourceForm<S: ResourceSpec> {
    spec: S,
    mode: FormMode,
    pub values: Values,
    pub errors: FieldErrors,
    pub alert: Option<ErrorMessage>,
    /// Display names of looked-up related resources, keyed by field name.
    pub lookup_names: BTreeMap<String, String>,
}

impl<S: ResourceSpec> ResourceForm<S> {
    pub fn new(spec: S, mode: FormMode) -> Self {
        Self {
            spec,
            mode,
            values: Values::new(),
            errors: FieldErrors::new(),
            alert: None,
            lookup_names: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
        self.errors.remove(field);
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn noun(&self) -> &'static str {
        self.spec.kind().noun()
    }

    /// Loads the resource being edited along with the names of its lookups.
    /// A no-op when adding.
    pub async fn load(&mut self, client: &ApiClient) -> Result<()> {
        let FormMode::Edit(id) = self.mode else {
            return Ok(());
        };
        let resource: Value = match client.get(&self.spec.read_path(id)).await {
            Ok(resource) => resource,
            Err(e) => {
                self.alert = Some(e.to_message(&format!("retrieve {}", self.noun())));
                return Err(e.into());
            }
        };
        self.values = self.spec.from_resource(&resource)?;
        self.resolve_lookups(client).await;
        debug!(resource = self.spec.kind().segment(), id, "Loaded form values");
        Ok(())
    }

    /// Lookup failures leave the name blank; the id is still editable.
    async fn resolve_lookups(&mut self, client: &ApiClient) {
        let lookups: Vec<(&'static str, &'static str, Id)> = self
            .spec
            .schema()
            .fields
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Lookup(collection) => {
                    let id = self.values.get(f.name).and_then(Value::as_i64)?;
                    Some((f.name, collection, id))
                }
                _ => None,
            })
            .collect();

        for (field, collection, id) in lookups {
            let Some(kind) = ResourceKind::parse(collection) else {
                continue;
            };
            match client.get::<Value>(&kind.detail_path(id)).await {
                Ok(related) => {
                    let name = related.get("name").and_then(Value::as_str).unwrap_or_default();
                    self.lookup_names.insert(field.to_string(), name.to_string());
                    self.spec.lookup_resolved(field, &related, &mut self.values);
                }
                Err(e) => warn!(field, id, error = %e, "Failed to resolve lookup"),
            }
        }
    }

    /// Points a lookup field at a resource picked from its list.
    pub fn select_lookup(&mut self, field: &str, related: &Value) {
        let Some(id) = related.get("id").and_then(Value::as_i64) else {
            return;
        };
        let name = related.get("name").and_then(Value::as_str).unwrap_or_default();
        self.set(field, id);
        self.lookup_names.insert(field.to_string(), name.to_string());
        self.spec.lookup_resolved(field, related, &mut self.values);
    }

    pub fn validate(&mut self) -> bool {
        self.errors = self.spec.schema().validate(&self.values);
        self.errors.is_empty()
    }

    /// POSTs (add) or PUTs (edit) the visible fields. On success the caller
    /// navigates to the saved resource with a forced reload.
    pub async fn save(&mut self, client: &ApiClient) -> Result<Navigation> {
        if !self.validate() {
            return Err(ConsoleError::Validation(self.errors.clone()));
        }
        let payload = match self.spec.to_payload(&self.values) {
            Ok(payload) => payload,
            Err(ConsoleError::Validation(errors)) => {
                self.errors.extend(errors.clone());
                return Err(ConsoleError::Validation(errors));
            }
            Err(e) => return Err(e),
        };

        let (action, response) = match self.mode {
            FormMode::Add => (
                "create",
                client.post::<Value, _>(&self.spec.create_path(), &payload).await,
            ),
            FormMode::Edit(id) => (
                "update",
                client.put::<Value, _>(&self.spec.update_path(id), &payload).await,
            ),
        };

        match response {
            Ok(saved) => {
                let id = match (saved.get("id").and_then(Value::as_i64), self.mode) {
                    (Some(id), _) | (None, FormMode::Edit(id)) => id,
                    (None, FormMode::Add) => {
                        return Err(ConsoleError::Content(format!(
                            "created {} has no id",
                            self.noun()
                        )));
                    }
                };
                info!(resource = self.spec.kind().segment(), id, action, "Saved resource");
                self.alert = None;
                Ok(Navigation {
                    path: self.spec.detail_route(id),
                    reload: true,
                })
            }
            Err(e) => {
                self.errors.extend(field_errors_from(&e, self.spec.schema(), &self.values));
                self.alert = Some(e.to_message(&format!("{} {}", action, self.noun())));
                Err(e.into())
            }
        }
    }
}

/// Maps a 400 body like `{"name": ["This field may not be blank."]}` onto
/// visible form fields. Keys are matched against both field and API names.
pub fn field_errors_from(error: &ApiError, schema: &FormSchema, values: &Values) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let ApiError::Status { status: 400, body, .. } = error else {
        return errors;
    };
    let Some(body) = body.as_object() else {
        return errors;
    };

    let mut flat: Vec<(&String, &Value)> = body.iter().collect();
    // Grouped fields come back nested, e.g. {"inputs": {"host": [...]}}.
    let mut groups: Vec<&str> = schema.fields.iter().filter_map(|f| f.group).collect();
    groups.sort_unstable();
    groups.dedup();
    for group in groups {
        if let Some(Value::Object(inner)) = body.get(group) {
            flat.extend(inner.iter());
        }
    }

    for (key, value) in flat {
        let message = match value {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "),
            Value::String(s) => s.clone(),
            _ => continue,
        };
        if message.is_empty() {
            continue;
        }
        if let Some(field) = schema
            .visible_fields(values)
            .find(|f| f.name == key.as_str() || f.api_name() == key.as_str())
        {
            errors.insert(field.name.to_string(), message);
        }
    }
    errors
}
