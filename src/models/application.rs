//! Job application model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// Review state of an application.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }
}

/// A candidate's application to a job posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub job_id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    /// Path of the uploaded resume, fetched for preview
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Resource for JobApplication {
    const COLLECTION: &'static str = "applications";
    const ITEMS_KEY: &'static str = "applications";
    const LABEL: &'static str = "Application";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("fullName", "Full name")
            .required("email", "Email")
            .email("email")
            .min_attachments("resume", 1, "Please attach a resume")
    }
}
