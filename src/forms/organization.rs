use crate::api::endpoints::ResourceKind;
use crate::forms::controller::ResourceSpec;
use crate::forms::schema::{FieldKind, FieldSchema, FormSchema};

pub fn organization_form() -> FormSchema {
    FormSchema::new(
        "organization",
        vec![
            FieldSchema::text("name", "Name").required().max_length(512),
            FieldSchema::text("description", "Description"),
            FieldSchema::new("max_hosts", "Max Hosts", FieldKind::Number)
                .help("The maximum number of hosts allowed to be managed by this organization. 0 means no limit."),
        ],
    )
}

pub struct OrganizationSpec {
    schema: FormSchema,
}

impl OrganizationSpec {
    pub fn new() -> Self {
        Self {
            schema: organization_form(),
        }
    }
}

impl Default for OrganizationSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSpec for OrganizationSpec {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Organizations
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }
}
