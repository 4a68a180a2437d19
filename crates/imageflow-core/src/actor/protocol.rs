use serde::{Deserialize, Serialize};

use crate::condition::{ConditionStatus, ImageCondition};

/// One revision exchanged with the checker actor.
///
/// `exist` is written as an empty string on requests and carries the
/// registry verdict on responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRevision {
    pub registry: String,
    #[serde(default)]
    pub resolved_revision: String,
    pub revision: String,
    #[serde(default, with = "exist_field")]
    pub exist: Option<ConditionStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub revisions: Vec<CheckRevision>,
}

impl CheckRequest {
    /// Join one registry with every given condition, keeping their order.
    pub fn from_conditions<'a, I>(registry: &str, conditions: I) -> Self
    where
        I: IntoIterator<Item = &'a ImageCondition>,
    {
        let revisions = conditions
            .into_iter()
            .map(|c| CheckRevision {
                registry: registry.to_string(),
                resolved_revision: c.resolved_revision.clone(),
                revision: c.revision.clone(),
                exist: None,
            })
            .collect();

        Self { revisions }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub revisions: Vec<CheckRevision>,
}

mod exist_field {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::condition::ConditionStatus;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<ConditionStatus>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(status) => status.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ConditionStatus>, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}
