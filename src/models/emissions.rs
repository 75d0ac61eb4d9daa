//! Emissions data model.

use serde::{Deserialize, Serialize};

use super::Resource;
use crate::form::FormSchema;

/// One reported emissions figure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub facility: String,
    pub year: i32,
    /// GHG protocol scope: "1", "2" or "3"
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub co2e_tonnes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Resource for EmissionsRecord {
    const COLLECTION: &'static str = "emissions";
    const ITEMS_KEY: &'static str = "records";
    const LABEL: &'static str = "Emissions record";

    fn id(&self) -> &str {
        &self.id
    }

    fn form_schema() -> FormSchema {
        FormSchema::new()
            .required("facility", "Facility")
            .required("year", "Year")
            .year("year")
            .required("scope", "Scope")
    }
}
