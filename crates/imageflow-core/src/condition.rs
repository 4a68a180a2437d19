use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a condition tracks for one revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ConditionType {
    Detected,
    Checked,
    Uploaded,
}

impl ConditionType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detected => "Detected",
            Self::Checked => "Checked",
            Self::Uploaded => "Uploaded",
        }
    }
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConditionType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Detected" => Ok(Self::Detected),
            "Checked" => Ok(Self::Checked),
            "Uploaded" => Ok(Self::Uploaded),
            _ => Err(crate::Error::InvalidConditionType(s.to_string())),
        }
    }
}

/// Tri-state outcome of a pipeline stage.
///
/// `False` means the stage still has work to do, `Unknown` that it has not
/// been evaluated yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConditionStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "True" => Ok(Self::True),
            "False" => Ok(Self::False),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(crate::Error::InvalidConditionStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    pub revision: String,
    #[serde(default)]
    pub resolved_revision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl ImageCondition {
    #[must_use]
    pub fn new(condition_type: ConditionType, status: ConditionStatus, revision: &str) -> Self {
        Self {
            condition_type,
            status,
            revision: revision.to_string(),
            resolved_revision: String::new(),
            last_transition_time: None,
        }
    }

    #[must_use]
    pub fn with_resolved_revision(mut self, resolved: &str) -> Self {
        self.resolved_revision = resolved.to_string();
        self
    }

    fn matches(&self, condition_type: ConditionType, revision: &str) -> bool {
        self.condition_type == condition_type && self.revision == revision
    }
}

/// Conditions of the given type and status, in list order.
pub fn filter_conditions(
    conditions: &[ImageCondition],
    condition_type: ConditionType,
    status: ConditionStatus,
) -> Vec<&ImageCondition> {
    conditions
        .iter()
        .filter(|c| c.condition_type == condition_type && c.status == status)
        .collect()
}

pub fn find_condition<'a>(
    conditions: &'a [ImageCondition],
    condition_type: ConditionType,
    revision: &str,
) -> Option<&'a ImageCondition> {
    conditions.iter().find(|c| c.matches(condition_type, revision))
}

/// Replace the `(condition_type, revision)` record in place, or append it.
///
/// `last_transition_time` only moves when status or resolved revision actually
/// change, so re-applying the same update leaves the list untouched. Returns
/// whether anything changed.
pub fn upsert_condition(
    conditions: &mut Vec<ImageCondition>,
    condition_type: ConditionType,
    status: ConditionStatus,
    revision: &str,
    resolved_revision: &str,
    now: DateTime<Utc>,
) -> bool {
    if let Some(existing) = conditions
        .iter_mut()
        .find(|c| c.matches(condition_type, revision))
    {
        if existing.status == status && existing.resolved_revision == resolved_revision {
            return false;
        }
        existing.status = status;
        resolved_revision.clone_into(&mut existing.resolved_revision);
        existing.last_transition_time = Some(now);
        return true;
    }

    conditions.push(ImageCondition {
        condition_type,
        status,
        revision: revision.to_string(),
        resolved_revision: resolved_revision.to_string(),
        last_transition_time: Some(now),
    });
    true
}
