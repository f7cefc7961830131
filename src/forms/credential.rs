//! 凭证表单：字段随凭证类型的 `kind` 显示或隐藏。
//!
//! `kind` is never sent; it is taken from the selected credential type.

use serde_json::Value;

use crate::api::endpoints::ResourceKind;
use crate::forms::controller::ResourceSpec;
use crate::forms::schema::{FieldKind, FieldSchema, FormSchema, Values, one_of, str_of, truthy};

pub const KINDS: &[(&str, &str)] = &[
    ("ssh", "Machine"),
    ("net", "Network"),
    ("scm", "Source Control"),
    ("aws", "Amazon Web Services"),
    ("rax", "Rackspace"),
    ("vmware", "VMware vCenter"),
    ("satellite6", "Red Hat Satellite 6"),
    ("cloudforms", "Red Hat CloudForms"),
    ("gce", "Google Compute Engine"),
    ("azure_rm", "Microsoft Azure Resource Manager"),
    ("openstack", "OpenStack"),
    ("insights", "Insights"),
];

pub const BECOME_METHODS: &[(&str, &str)] = &[
    ("", "None"),
    ("sudo", "Sudo"),
    ("su", "Su"),
    ("pbrun", "Pbrun"),
    ("pfexec", "Pfexec"),
    ("dzdo", "DZDO"),
    ("pmrun", "Pmrun"),
    ("runas", "Runas"),
];

const INPUTS: &str = "inputs";

fn kind_is(values: &Values, kinds: &[&str]) -> bool {
    one_of(values, "kind", kinds)
}

fn is_aws(v: &Values) -> bool {
    kind_is(v, &["aws"])
}

fn is_ssh(v: &Values) -> bool {
    kind_is(v, &["ssh"])
}

fn is_gce(v: &Values) -> bool {
    kind_is(v, &["gce"])
}

fn is_rax(v: &Values) -> bool {
    kind_is(v, &["rax"])
}

fn is_azure(v: &Values) -> bool {
    kind_is(v, &["azure_rm"])
}

fn is_openstack(v: &Values) -> bool {
    kind_is(v, &["openstack"])
}

fn is_net(v: &Values) -> bool {
    kind_is(v, &["net"])
}

fn has_host(v: &Values) -> bool {
    kind_is(v, &["vmware", "openstack", "satellite6", "cloudforms"])
}

fn has_username(v: &Values) -> bool {
    !str_of(v, "kind").is_empty() && !kind_is(v, &["aws", "gce", "azure_rm"])
}

fn needs_username(v: &Values) -> bool {
    kind_is(v, &["rax", "vmware", "openstack", "satellite6", "cloudforms", "net", "insights"])
}

fn has_password(v: &Values) -> bool {
    kind_is(v, &["scm", "vmware", "openstack", "satellite6", "cloudforms", "net", "azure_rm", "insights"])
}

fn needs_password(v: &Values) -> bool {
    kind_is(v, &["vmware", "openstack", "satellite6", "cloudforms", "insights"])
}

fn has_key_data(v: &Values) -> bool {
    kind_is(v, &["ssh", "scm", "gce", "net"])
}

fn has_key_unlock(v: &Values) -> bool {
    kind_is(v, &["ssh", "scm", "net"])
}

fn has_become(v: &Values) -> bool {
    is_ssh(v) && !str_of(v, "become_method").is_empty()
}

fn has_project(v: &Values) -> bool {
    kind_is(v, &["gce", "openstack"])
}

fn authorizes(v: &Values) -> bool {
    is_net(v) && truthy(v, "authorize")
}

pub fn credential_form() -> FormSchema {
    FormSchema::new(
        "credential",
        vec![
            FieldSchema::text("name", "Name").required().max_length(512),
            FieldSchema::text("description", "Description"),
            FieldSchema::new("organization", "Organization", FieldKind::Lookup("organizations")),
            FieldSchema::new("credential_type", "Credential Type", FieldKind::Lookup("credential_types")).required(),
            FieldSchema::new("kind", "Type", FieldKind::Select(KINDS)).required().local(),
            FieldSchema::text("access_key", "Access Key")
                .api("username")
                .group(INPUTS)
                .show_when(is_aws)
                .required_when(is_aws),
            FieldSchema::sensitive("secret_key", "Secret Key")
                .api("password")
                .group(INPUTS)
                .show_when(is_aws)
                .required_when(is_aws),
            FieldSchema::sensitive("security_token", "STS Token")
                .group(INPUTS)
                .show_when(is_aws)
                .help("Security Token Service (STS) is a web service for temporary, limited-privilege credentials."),
            FieldSchema::text("host", "Host")
                .group(INPUTS)
                .show_when(has_host)
                .required_when(has_host),
            FieldSchema::text("subscription", "Subscription ID")
                .group(INPUTS)
                .show_when(is_azure)
                .required_when(is_azure),
            FieldSchema::text("username", "Username")
                .group(INPUTS)
                .show_when(has_username)
                .required_when(needs_username),
            FieldSchema::new("email_address", "Service Account Email Address", FieldKind::Email)
                .api("username")
                .group(INPUTS)
                .show_when(is_gce)
                .required_when(is_gce),
            FieldSchema::sensitive("api_key", "API Key")
                .group(INPUTS)
                .show_when(is_rax)
                .required_when(is_rax),
            FieldSchema::sensitive("password", "Password")
                .group(INPUTS)
                .show_when(has_password)
                .required_when(needs_password),
            FieldSchema::sensitive("ssh_password", "Password")
                .api("password")
                .group(INPUTS)
                .show_when(is_ssh)
                .ask(),
            FieldSchema::new("ssh_key_data", "Private Key", FieldKind::Textarea)
                .group(INPUTS)
                .show_when(has_key_data)
                .required_when(is_gce)
                .help("Paste the contents of the PEM file associated with the key."),
            FieldSchema::sensitive("ssh_key_unlock", "Private Key Passphrase")
                .group(INPUTS)
                .show_when(has_key_unlock)
                .ask(),
            FieldSchema::new("become_method", "Privilege Escalation", FieldKind::Select(BECOME_METHODS))
                .group(INPUTS)
                .show_when(is_ssh),
            FieldSchema::text("become_username", "Privilege Escalation Username")
                .group(INPUTS)
                .show_when(has_become),
            FieldSchema::sensitive("become_password", "Privilege Escalation Password")
                .group(INPUTS)
                .show_when(has_become)
                .ask(),
            FieldSchema::text("client", "Client ID").group(INPUTS).show_when(is_azure),
            FieldSchema::sensitive("secret", "Client Secret").group(INPUTS).show_when(is_azure),
            FieldSchema::text("tenant", "Tenant ID").group(INPUTS).show_when(is_azure),
            FieldSchema::new("authorize", "Authorize", FieldKind::Checkbox)
                .group(INPUTS)
                .show_when(is_net),
            FieldSchema::sensitive("authorize_password", "Authorize Password")
                .group(INPUTS)
                .show_when(authorizes),
            FieldSchema::text("project", "Project")
                .group(INPUTS)
                .show_when(has_project)
                .required_when(has_project),
            FieldSchema::text("domain", "Domain Name")
                .group(INPUTS)
                .show_when(is_openstack),
            FieldSchema::sensitive("vault_password", "Vault Password")
                .group(INPUTS)
                .show_when(is_ssh)
                .ask(),
            FieldSchema::text("vault_id", "Vault Identifier").group(INPUTS).show_when(is_ssh),
        ],
    )
}

pub struct CredentialSpec {
    schema: FormSchema,
}

impl CredentialSpec {
    pub fn new() -> Self {
        Self {
            schema: credential_form(),
        }
    }
}

impl Default for CredentialSpec {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSpec for CredentialSpec {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Credentials
    }

    fn schema(&self) -> &FormSchema {
        &self.schema
    }

    fn lookup_resolved(&self, field: &str, related: &Value, values: &mut Values) {
        if field == "credential_type" {
            values.insert("kind".to_string(), Value::String(credential_type_kind(related).to_string()));
        }
    }
}

/// Form kind of a credential type. Managed types carry it as `namespace`;
/// custom types fall back to their `kind`.
pub fn credential_type_kind(credential_type: &Value) -> &str {
    ["namespace", "kind"]
        .iter()
        .filter_map(|key| credential_type.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}
