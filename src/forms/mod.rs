//! Resource forms and list screens.

pub mod controller;
pub mod credential;
pub mod list;
pub mod organization;
pub mod permissions;
pub mod rrule;
pub mod schedule;
pub mod schema;

pub use controller::{FormMode, Navigation, ResourceForm, ResourceSpec};
pub use credential::CredentialSpec;
pub use list::{ListController, corrected_page_after_delete};
pub use organization::OrganizationSpec;
pub use schedule::ScheduleSpec;
pub use schema::{FieldKind, FieldSchema, FormSchema, Values};
