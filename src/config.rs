//! Install configuration tree
//!
//! The configuration arrives already schema-valid: structural checks
//! (required fields, value formats) happened upstream. The types here are
//! the read-only input to semantic validation against live infrastructure
//! state. Exactly one platform configuration exists per run; machine pools
//! are zero or more, split into the control-plane slot and the compute
//! list.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A cluster install configuration
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    /// Cluster name; the first label of the cluster domain
    pub name: String,

    /// Base DNS domain the cluster domain is created under
    pub base_domain: String,

    /// Cluster-wide network configuration
    #[serde(default)]
    pub networking: Networking,

    /// Whether cluster endpoints are published externally or internally
    #[serde(default)]
    pub publish: PublishingStrategy,

    /// Per-cloud platform configuration
    pub platform: PlatformConfig,

    /// Control-plane machine pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<MachinePool>,

    /// Compute machine pools
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute: Vec<MachinePool>,
}

impl InstallConfig {
    /// The cluster's fully-qualified domain, `{name}.{baseDomain}`
    pub fn cluster_domain(&self) -> String {
        format!("{}.{}", self.name, self.base_domain)
    }
}

/// Platform configuration keyed by cloud
///
/// Only one cloud is populated per run.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    /// AWS platform configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<Platform>,
}

/// AWS platform configuration
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// Region the cluster is installed into
    pub region: String,

    /// Pre-existing subnets the cluster is installed into.
    ///
    /// When empty, subnets are provisioned per zone by the installer and
    /// topology validation is skipped entirely.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,

    /// Custom service-endpoint overrides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_endpoints: Vec<ServiceEndpoint>,

    /// Pre-existing hosted zone id for the cluster's DNS records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_zone: Option<String>,

    /// Machine image applied to all pools unless overridden per pool
    #[serde(default, rename = "amiId", skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<String>,

    /// Defaults applied to every machine pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_machine_platform: Option<MachinePoolPlatform>,
}

/// A custom endpoint for one cloud service
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ServiceEndpoint {
    /// Service identifier (e.g. "ec2")
    pub name: String,
    /// Endpoint URL, scheme included
    pub url: String,
}

/// A machine pool declaration
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachinePool {
    /// Role tag for the pool (e.g. "master", "worker")
    pub name: String,

    /// Number of machines in the pool
    #[serde(default = "default_replicas")]
    pub replicas: u64,

    /// Per-cloud pool configuration
    #[serde(default)]
    pub platform: MachinePoolPlatformConfig,
}

fn default_replicas() -> u64 {
    1
}

/// Machine pool configuration keyed by cloud
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolPlatformConfig {
    /// AWS pool configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<MachinePoolPlatform>,
}

/// AWS machine pool configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolPlatform {
    /// Availability zones the pool's machines may be placed in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    /// Instance type for the pool's machines
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,

    /// Machine image for the pool's machines
    #[serde(default, rename = "amiId", skip_serializing_if = "Option::is_none")]
    pub ami_id: Option<String>,
}

/// Cluster-wide network declaration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Address space cluster machines must fall inside
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_network: Vec<MachineNetworkEntry>,
}

/// One CIDR entry of the machine network
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct MachineNetworkEntry {
    /// CIDR range, e.g. "10.0.0.0/16"
    pub cidr: String,
}

/// Where cluster endpoints are published
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PublishingStrategy {
    /// Endpoints are reachable from outside the cluster network
    #[default]
    External,
    /// Endpoints are reachable only from inside the cluster network
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_platform() -> Platform {
        Platform {
            region: "us-east-1".to_string(),
            subnets: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            service_endpoints: Vec::new(),
            hosted_zone: None,
            ami_id: None,
            default_machine_platform: None,
        }
    }

    /// Story: Operator declares an install config in YAML
    ///
    /// Install configs are written by hand in YAML. The wire form uses
    /// camelCase and the cloud-keyed platform nesting.
    #[test]
    fn story_yaml_manifest_defines_install_config() {
        let yaml = r#"
name: prod
baseDomain: example.com
networking:
  machineNetwork:
    - cidr: "10.0.0.0/16"
platform:
  aws:
    region: us-east-1
    subnets:
      - subnet-a
      - subnet-b
controlPlane:
  name: master
  replicas: 3
  platform:
    aws:
      type: m5.xlarge
compute:
  - name: worker
    replicas: 3
    platform:
      aws:
        zones:
          - us-east-1a
"#;
        let config: InstallConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.cluster_domain(), "prod.example.com");
        assert_eq!(config.publish, PublishingStrategy::External);
        let platform = config.platform.aws.as_ref().unwrap();
        assert_eq!(platform.subnets.len(), 2);
        let cp = config.control_plane.as_ref().unwrap();
        assert_eq!(
            cp.platform.aws.as_ref().unwrap().instance_type.as_deref(),
            Some("m5.xlarge")
        );
        assert_eq!(config.compute[0].platform.aws.as_ref().unwrap().zones[0], "us-east-1a");
    }

    #[test]
    fn publish_defaults_to_external_and_parses_internal() {
        let yaml = r#"
name: quiet
baseDomain: example.com
publish: Internal
platform:
  aws:
    region: us-east-1
"#;
        let config: InstallConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.publish, PublishingStrategy::Internal);
    }

    #[test]
    fn replicas_default_when_omitted() {
        let yaml = r#"
name: worker
platform: {}
"#;
        let pool: MachinePool = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pool.replicas, 1);
        assert!(pool.platform.aws.is_none());
    }

    #[test]
    fn instance_type_uses_the_type_wire_name() {
        let pool = MachinePoolPlatform {
            zones: Vec::new(),
            instance_type: Some("m5.large".to_string()),
            ami_id: None,
        };
        let json = serde_json::to_string(&pool).unwrap();
        assert!(json.contains("\"type\":\"m5.large\""));
    }

    /// Story: Upstream schema validation consumes the exported schema
    ///
    /// Structural checks happen before this crate runs; the JSON schema
    /// they validate against is generated from these types.
    #[test]
    fn story_schema_exports_for_upstream_validation() {
        let schema = schemars::schema_for!(InstallConfig);
        let rendered = serde_json::to_value(&schema).unwrap();

        let properties = rendered
            .get("properties")
            .and_then(|p| p.as_object())
            .expect("schema must list properties");
        assert!(properties.contains_key("baseDomain"));
        assert!(properties.contains_key("controlPlane"));
        assert!(properties.contains_key("platform"));
    }

    #[test]
    fn config_survives_yaml_roundtrip() {
        let config = InstallConfig {
            name: "prod".to_string(),
            base_domain: "example.com".to_string(),
            networking: Networking {
                machine_network: vec![MachineNetworkEntry {
                    cidr: "10.0.0.0/16".to_string(),
                }],
            },
            publish: PublishingStrategy::External,
            platform: PlatformConfig {
                aws: Some(sample_platform()),
            },
            control_plane: None,
            compute: Vec::new(),
        };

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: InstallConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, parsed);
    }
}
