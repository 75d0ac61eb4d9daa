//! Team member model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// A person shown on the team page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Resource for TeamMember {
    const COLLECTION: &'static str = "team";
    const ITEMS_KEY: &'static str = "members";
    const LABEL: &'static str = "Team member";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("name", "Name")
            .required("role", "Role")
            .min_attachments("photo", 1, "Please upload a photo")
    }
}
