// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Wire models shared by the asset, logging and App Hub clients
//!
//! Field names follow the REST (JSON) representation of the APIs, so these
//! types deserialize straight from response bodies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tag attached to a resource, as reported by Cloud Asset Inventory
///
/// Keys and values are namespaced paths, e.g. `123456/env` and `123456/env/prod`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub tag_key: String,
    pub tag_key_id: String,
    pub tag_value: String,
    pub tag_value_id: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag_key: key.into(),
            tag_value: value.into(),
            ..Default::default()
        }
    }
}

/// Tags inherited from one ancestor in the resource hierarchy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectiveTagDetails {
    pub attached_resource: String,
    pub effective_tags: Vec<Tag>,
}

/// A discovered cloud resource (`ResourceSearchResult` in Cloud Asset Inventory)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRecord {
    /// Full resource name, e.g. `//run.googleapis.com/projects/p/locations/us-west1/services/checkout`
    pub name: String,
    /// Asset type, e.g. `run.googleapis.com/Service`
    pub asset_type: String,
    /// Owning project, `projects/{number}`
    pub project: String,
    pub display_name: String,
    pub location: String,
    pub labels: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub effective_tags: Vec<EffectiveTagDetails>,
    pub parent_full_resource_name: String,
    pub parent_asset_type: String,
}

impl ResourceRecord {
    /// Last path segment of the resource name
    pub fn short_name(&self) -> &str {
        last_segment(&self.name)
    }

    /// All inherited tags, ancestor by ancestor
    pub fn inherited_tags(&self) -> impl Iterator<Item = &Tag> {
        self.effective_tags
            .iter()
            .flat_map(|details| details.effective_tags.iter())
    }
}

/// Last `/`-separated segment of a path-like string
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a resource is registered as an App Hub service or workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppHubType {
    #[serde(rename = "discoveredService")]
    Service,
    #[serde(rename = "discoveredWorkload")]
    Workload,
}

impl AppHubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppHubType::Service => "discoveredService",
            AppHubType::Workload => "discoveredWorkload",
        }
    }

    /// IAM permission required to look up discovered resources of this type
    pub fn lookup_permission(&self) -> &'static str {
        match self {
            AppHubType::Service => "apphub.discoveredServices.list",
            AppHubType::Workload => "apphub.discoveredWorkloads.list",
        }
    }
}

impl std::fmt::Display for AppHubType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// App Hub's record of an existing resource (`DiscoveredService` / `DiscoveredWorkload`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveredTwin {
    /// `projects/{p}/locations/{l}/discoveredServices/{id}`
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeType {
    TypeUnspecified,
    Regional,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: ScopeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriticalityType {
    TypeUnspecified,
    MissionCritical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Criticality {
    #[serde(rename = "type")]
    pub kind: CriticalityType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentType {
    TypeUnspecified,
    Production,
    Staging,
    Test,
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(rename = "type")]
    pub kind: EnvironmentType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    pub email: String,
}

/// User-supplied App Hub attributes attached to everything the pipeline creates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub developer_owners: Vec<ContactInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operator_owners: Vec<ContactInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub business_owners: Vec<ContactInfo>,
}

impl Attributes {
    /// Parse an attributes document; blank input means "no attributes"
    pub fn from_json(data: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(data).map(Some)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub discovered_service: String,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub discovered_workload: String,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_record_from_asset_json() {
        let json = r#"{
            "name": "//run.googleapis.com/projects/shop/locations/us-west1/services/checkout",
            "assetType": "run.googleapis.com/Service",
            "project": "projects/123456",
            "location": "us-west1",
            "labels": {"appid": "checkout"},
            "tags": [{"tagKey": "123/env", "tagValue": "123/env/prod"}],
            "effectiveTags": [
                {"attachedResource": "//cloudresourcemanager.googleapis.com/folders/9",
                 "effectiveTags": [{"tagKey": "9/team", "tagValue": "9/team/payments"}]}
            ],
            "somethingNew": true
        }"#;
        let record: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.short_name(), "checkout");
        assert_eq!(record.labels.get("appid").map(String::as_str), Some("checkout"));
        assert_eq!(record.tags[0].tag_value, "123/env/prod");
        let inherited: Vec<_> = record.inherited_tags().collect();
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited[0].tag_key, "9/team");
        assert!(record.parent_full_resource_name.is_empty());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("a/b/c"), "c");
        assert_eq!(last_segment("plain"), "plain");
        assert_eq!(last_segment("trailing/"), "");
    }

    #[test]
    fn test_attributes_valid_json() {
        let data = br#"{"criticality":{"type":"MISSION_CRITICAL"},"environment":{"type":"PRODUCTION"}}"#;
        let attrs = Attributes::from_json(data).unwrap().unwrap();
        assert_eq!(
            attrs.criticality,
            Some(Criticality {
                kind: CriticalityType::MissionCritical
            })
        );
        assert_eq!(
            attrs.environment,
            Some(Environment {
                kind: EnvironmentType::Production
            })
        );
        assert!(attrs.developer_owners.is_empty());
    }

    #[test]
    fn test_attributes_owners() {
        let data = br#"{"developerOwners":[{"displayName":"Dev","email":"dev@example.com"}]}"#;
        let attrs = Attributes::from_json(data).unwrap().unwrap();
        assert_eq!(attrs.developer_owners[0].email, "dev@example.com");
    }

    #[test]
    fn test_attributes_invalid_json() {
        let data = br#"{"criticality":{"type":"MISSION_CRITICAL"}"#;
        assert!(Attributes::from_json(data).is_err());
    }

    #[test]
    fn test_attributes_unknown_field_rejected() {
        let data = br#"{"criticallity":{"type":"HIGH"}}"#;
        assert!(Attributes::from_json(data).is_err());
    }

    #[test]
    fn test_attributes_empty() {
        assert_eq!(Attributes::from_json(b"").unwrap(), None);
        assert_eq!(Attributes::from_json(b"  \n").unwrap(), None);
    }

    #[test]
    fn test_application_serializes_scope_and_attributes() {
        let app = Application {
            display_name: "checkout".to_string(),
            scope: Some(Scope {
                kind: ScopeType::Regional,
            }),
            attributes: Some(Attributes {
                environment: Some(Environment {
                    kind: EnvironmentType::Staging,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&app).unwrap();
        assert_eq!(value["displayName"], "checkout");
        assert_eq!(value["scope"]["type"], "REGIONAL");
        assert_eq!(value["attributes"]["environment"]["type"], "STAGING");
        assert!(value.get("name").is_none());
        assert!(value.get("state").is_none());
    }

    #[test]
    fn test_app_hub_type_permissions() {
        assert_eq!(
            AppHubType::Workload.lookup_permission(),
            "apphub.discoveredWorkloads.list"
        );
        assert_eq!(AppHubType::Service.to_string(), "discoveredService");
    }
}
