//! Project model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// A portfolio project with a photo gallery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Resource for Project {
    const COLLECTION: &'static str = "projects";
    const ITEMS_KEY: &'static str = "projects";
    const LABEL: &'static str = "Project";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("title", "Title")
            .required("category", "Category")
            .required("description", "Description")
            .min_attachments("images", 1, "At least one image is required")
    }
}
