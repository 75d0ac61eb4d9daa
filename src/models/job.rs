//! Job posting model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// An open position shown on the careers page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Resource for JobPosting {
    const COLLECTION: &'static str = "jobs";
    const ITEMS_KEY: &'static str = "jobs";
    const LABEL: &'static str = "Job posting";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("title", "Title")
            .required("department", "Department")
            .required("location", "Location")
            .required("description", "Description")
    }
}

/// Server-computed counters for the jobs panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    #[serde(default)]
    pub total_jobs: u64,
    #[serde(default)]
    pub active_jobs: u64,
    #[serde(default)]
    pub total_applications: u64,
    #[serde(default)]
    pub pending_applications: u64,
}
