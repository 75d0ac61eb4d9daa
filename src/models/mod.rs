//! Content types managed through the admin API.
//!
//! Each type names its collection, its realtime room and its form rules; the
//! list controller needs nothing else to manage it.

mod application;
mod climate;
mod emissions;
mod job;
mod journey;
mod project;
mod story;
mod team;

pub use application::*;
pub use climate::*;
pub use emissions::*;
pub use job::*;
pub use journey::*;
pub use project::*;
pub use story::*;
pub use team::*;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::form::FormSchema;

/// A record type stored in a server-owned collection.
pub trait Resource: DeserializeOwned + Clone + Send + Sync + fmt::Debug + 'static {
    /// URL segment under `/api`
    const COLLECTION: &'static str;
    /// Key of the record array inside a list reply's `data`
    const ITEMS_KEY: &'static str;
    /// Prefix of realtime event names
    const EVENT_PREFIX: &'static str = Self::COLLECTION;
    /// Human noun used in notifications
    const LABEL: &'static str;

    /// Server-assigned identifier.
    fn id(&self) -> &str;

    fn form_schema() -> FormSchema;

    /// Realtime room joined while a view of this collection is open.
    fn room() -> String {
        format!("{}-room", Self::EVENT_PREFIX)
    }
}

/// Collections known to the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Jobs,
    Applications,
    Stories,
    Journey,
    Team,
    Projects,
    ClimateFeatures,
    Emissions,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Jobs,
        ResourceKind::Applications,
        ResourceKind::Stories,
        ResourceKind::Journey,
        ResourceKind::Team,
        ResourceKind::Projects,
        ResourceKind::ClimateFeatures,
        ResourceKind::Emissions,
    ];

    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Jobs => JobPosting::COLLECTION,
            ResourceKind::Applications => JobApplication::COLLECTION,
            ResourceKind::Stories => StorySubmission::COLLECTION,
            ResourceKind::Journey => JourneyMilestone::COLLECTION,
            ResourceKind::Team => TeamMember::COLLECTION,
            ResourceKind::Projects => Project::COLLECTION,
            ResourceKind::ClimateFeatures => ClimateFeature::COLLECTION,
            ResourceKind::Emissions => EmissionsRecord::COLLECTION,
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == wanted)
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_lookup() {
        assert_eq!("jobs".parse::<ResourceKind>(), Ok(ResourceKind::Jobs));
        assert_eq!(
            " Climate-Features ".parse::<ResourceKind>(),
            Ok(ResourceKind::ClimateFeatures)
        );
        assert!("topics".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_rooms() {
        assert_eq!(JobPosting::room(), "jobs-room");
        assert_eq!(JobApplication::room(), "applications-room");
        assert_eq!(EmissionsRecord::room(), "emissions-room");
    }
}
