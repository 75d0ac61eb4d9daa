//! Climate-intelligence feature model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// A feature card on the climate-intelligence page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClimateFeature {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Accent color as `#RRGGBB`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Resource for ClimateFeature {
    const COLLECTION: &'static str = "climate-features";
    const ITEMS_KEY: &'static str = "features";
    const LABEL: &'static str = "Climate feature";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("title", "Title")
            .required("description", "Description")
            .hex_color("color")
    }
}
