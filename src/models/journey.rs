//! Journey milestone model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JourneyMilestone {
    #[serde(alias = "_id")]
    pub id: String,
    pub year: i32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub order: i32,
}

impl Resource for JourneyMilestone {
    const COLLECTION: &'static str = "journey";
    const ITEMS_KEY: &'static str = "milestones";
    const LABEL: &'static str = "Milestone";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("year", "Year")
            .year("year")
            .required("title", "Title")
            .required("description", "Description")
            .min_attachments("image", 1, "Please upload an image for this milestone")
    }
}
