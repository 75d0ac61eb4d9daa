//! Story submission model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// A community story sent in for publication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorySubmission {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// pending, approved or rejected
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_status() -> String {
    "pending".to_string()
}

impl Resource for StorySubmission {
    const COLLECTION: &'static str = "stories";
    const ITEMS_KEY: &'static str = "stories";
    const LABEL: &'static str = "Story";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("title", "Title")
            .required("authorName", "Author name")
            .required("content", "Content")
            .email("email")
            .min_attachments("images", 1, "At least one image is required")
    }
}
