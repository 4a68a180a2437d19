use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::CheckResponse;
use crate::condition::{
    filter_conditions, find_condition, upsert_condition, ConditionStatus, ConditionType,
    ImageCondition,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Registry repository the built image is pushed to
    pub target: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatus {
    #[serde(default)]
    pub conditions: Vec<ImageCondition>,
}

/// Image resource as held by the condition store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub namespace: String,
    pub name: String,
    /// Owned by the store; bumped on every accepted status update
    #[serde(default)]
    pub resource_version: i64,
    pub spec: ImageSpec,
    #[serde(default)]
    pub status: ImageStatus,
}

impl Image {
    #[must_use]
    pub fn new(namespace: &str, name: &str, target: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            resource_version: 0,
            spec: ImageSpec {
                target: target.to_string(),
                labels: BTreeMap::new(),
            },
            status: ImageStatus::default(),
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: ImageCondition) -> Self {
        self.status.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Revisions that still need a registry check.
    #[must_use]
    pub fn pending_checks(&self) -> Vec<&ImageCondition> {
        filter_conditions(
            &self.status.conditions,
            ConditionType::Checked,
            ConditionStatus::False,
        )
    }

    #[must_use]
    pub fn condition(&self, condition_type: ConditionType, revision: &str) -> Option<&ImageCondition> {
        find_condition(&self.status.conditions, condition_type, revision)
    }

    /// Fold a checker response into the conditions.
    ///
    /// Each reported revision becomes `Checked=True` and its `Uploaded`
    /// condition takes the reported existence, both pinned to the reported
    /// resolved revision. Returns the number of records that changed.
    pub fn apply_check_response(&mut self, response: &CheckResponse, now: DateTime<Utc>) -> usize {
        let conditions = &mut self.status.conditions;
        let mut changed = 0;

        for rev in &response.revisions {
            if upsert_condition(
                conditions,
                ConditionType::Checked,
                ConditionStatus::True,
                &rev.revision,
                &rev.resolved_revision,
                now,
            ) {
                changed += 1;
            }
            if upsert_condition(
                conditions,
                ConditionType::Uploaded,
                rev.exist.unwrap_or_default(),
                &rev.revision,
                &rev.resolved_revision,
                now,
            ) {
                changed += 1;
            }
        }

        changed
    }
}
