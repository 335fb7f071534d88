use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopBottom,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopBottom),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    /// Ranks advance along x instead of y.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    /// Rank 0 sits at the far end of the primary axis.
    pub fn is_mirrored(self) -> bool {
        matches!(self, Self::BottomTop | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Deployment,
    #[serde(alias = "statefulSet")]
    StatefulSet,
    Devbox,
    #[serde(alias = "cluster")]
    Database,
    #[serde(alias = "objectStorage", alias = "objectstoragebucket")]
    ObjectStorage,
    #[serde(other)]
    Unknown,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::StatefulSet => "statefulset",
            Self::Devbox => "devbox",
            Self::Database => "database",
            Self::ObjectStorage => "objectstorage",
            Self::Unknown => "unknown",
        }
    }

    pub fn node_kind(self) -> NodeKind {
        match self {
            Self::Deployment | Self::StatefulSet | Self::Devbox => NodeKind::Workload,
            Self::Database => NodeKind::Database,
            Self::ObjectStorage => NodeKind::Storage,
            Self::Unknown => NodeKind::Unknown,
        }
    }

    pub fn is_workload(self) -> bool {
        self.node_kind() == NodeKind::Workload
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Workload,
    Database,
    Storage,
    Network,
    Group,
    Unknown,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Workload => "workload",
            Self::Database => "database",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Group => "group",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_database_class(self) -> bool {
        matches!(self, Self::Database | Self::Storage)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    #[serde(default)]
    pub secret_key_ref: Option<KeyRef>,
    #[serde(default)]
    pub config_map_key_ref: Option<KeyRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    pub fn literal(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
            value_from: None,
        }
    }

    /// Strings that may mention another resource: the literal value and the
    /// name of any referenced secret or config map.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        let from = self.value_from.as_ref();
        self.value
            .as_deref()
            .into_iter()
            .chain(
                from.and_then(|src| src.secret_key_ref.as_ref())
                    .map(|r| r.name.as_str()),
            )
            .chain(
                from.and_then(|src| src.config_map_key_ref.as_ref())
                    .map(|r| r.name.as_str()),
            )
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    pub port: u16,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_domain: Option<String>,
}

impl PortRef {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            protocol: None,
            name: None,
            public_domain: None,
        }
    }

    pub fn label(&self) -> String {
        match self.protocol.as_deref() {
            Some(proto) if !proto.eq_ignore_ascii_case("tcp") => {
                format!("{}/{}", self.port, proto.to_ascii_uppercase())
            }
            _ => self.port.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub name: String,
    pub resource_type: ResourceType,
    #[serde(default, deserialize_with = "non_null_entries")]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "exposed_ports")]
    pub ports: Vec<PortRef>,
}

/// `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List that tolerates `null` for itself and for any of its entries.
fn non_null_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries: Vec<Option<T>> = null_as_default(deserializer)?;
    Ok(entries.into_iter().flatten().collect())
}

/// Port list that tolerates `null` and drops entries without a port number.
fn exposed_ports<'de, D>(deserializer: D) -> Result<Vec<PortRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct LoosePort {
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        public_domain: Option<String>,
    }

    let loose: Vec<LoosePort> = non_null_entries(deserializer)?;
    Ok(loose
        .into_iter()
        .filter_map(|entry| {
            Some(PortRef {
                port: entry.port?,
                protocol: entry.protocol,
                name: entry.name,
                public_domain: entry.public_domain,
            })
        })
        .collect())
}

impl ResourceSummary {
    pub fn new(name: &str, resource_type: ResourceType) -> Self {
        Self {
            name: name.to_string(),
            resource_type,
            env: Vec::new(),
            image: None,
            ports: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: Vec<EnvVar>) -> Self {
        self.env = env;
        self
    }

    pub fn with_image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn with_ports(mut self, ports: &[u16]) -> Self {
        self.ports = ports.iter().copied().map(PortRef::new).collect();
        self
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef {
            name: self.name.clone(),
            resource_type: self.resource_type,
        }
    }

    pub fn node_id(&self) -> String {
        node_id(self.resource_type, &self.name)
    }
}

/// Identity of a resource inside a reliance list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub name: String,
    pub resource_type: ResourceType,
}

impl ResourceRef {
    pub fn node_id(&self) -> String {
        node_id(self.resource_type, &self.name)
    }
}

pub fn node_id(resource_type: ResourceType, name: &str) -> String {
    format!("{}-{}", resource_type.as_str(), name).to_lowercase()
}

pub fn network_node_id(owner_id: &str) -> String {
    format!("network-{owner_id}")
}

pub fn edge_id(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ResourceType>,
    pub size: Size,
    /// Top-left corner.
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl GraphNode {
    pub fn new(id: &str, kind: NodeKind, size: Size) -> Self {
        Self {
            id: id.to_string(),
            kind,
            label: id.to_string(),
            resource_type: None,
            size,
            position: Position::default(),
            parent_id: None,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.position.x + self.size.width / 2.0,
            self.position.y + self.size.height / 2.0,
        )
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.height
    }

    /// Position relative to the parent frame, for renderers that nest
    /// children inside their group.
    pub fn relative_to(&self, parent: &GraphNode) -> Position {
        Position::new(
            self.position.x - parent.position.x,
            self.position.y - parent.position.y,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

impl GraphEdge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            id: edge_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            data: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data = Some(EdgeData {
            label: label.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl TopologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn group_node(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.kind == NodeKind::Group)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_lowercase_and_typed() {
        assert_eq!(node_id(ResourceType::Database, "Redis-ABC"), "database-redis-abc");
        assert_eq!(network_node_id("deployment-web"), "network-deployment-web");
        assert_eq!(edge_id("a", "b"), "a-b");
    }

    #[test]
    fn workload_subtypes_collapse_to_one_kind() {
        assert_eq!(ResourceType::Deployment.node_kind(), NodeKind::Workload);
        assert_eq!(ResourceType::StatefulSet.node_kind(), NodeKind::Workload);
        assert_eq!(ResourceType::Devbox.node_kind(), NodeKind::Workload);
        assert_eq!(ResourceType::ObjectStorage.node_kind(), NodeKind::Storage);
    }

    #[test]
    fn unknown_resource_types_deserialize() {
        let parsed: ResourceSummary =
            serde_json::from_str(r#"{"name":"x","resourceType":"cronjob"}"#).unwrap();
        assert_eq!(parsed.resource_type, ResourceType::Unknown);
        assert!(parsed.env.is_empty());
        assert!(parsed.ports.is_empty());
    }

    #[test]
    fn null_fields_read_as_absent() {
        let parsed: ResourceSummary = serde_json::from_str(
            r#"{"name":"web","resourceType":"deployment","env":null,"image":null,"ports":null}"#,
        )
        .unwrap();
        assert!(parsed.env.is_empty());
        assert!(parsed.image.is_none());
        assert!(parsed.ports.is_empty());

        let parsed: ResourceSummary = serde_json::from_str(
            r#"{"name":"web","resourceType":"deployment","env":[null,{"name":"A","value":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.env, vec![EnvVar::literal("A", "b")]);
    }

    #[test]
    fn ports_without_a_number_are_skipped() {
        let parsed: ResourceSummary = serde_json::from_str(
            r#"{"name":"web","resourceType":"deployment","ports":[
                {"publicDomain":"web.example.com"},
                null,
                {"port":null},
                {"port":8080,"protocol":null,"publicDomain":"api.example.com"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.ports.len(), 1);
        assert_eq!(parsed.ports[0].port, 8080);
        assert_eq!(parsed.ports[0].public_domain.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn null_env_names_and_refs_are_tolerated() {
        let parsed: EnvVar = serde_json::from_str(
            r#"{"name":null,"value":null,"valueFrom":{"secretKeyRef":{"name":"pg-conn","key":null},"configMapKeyRef":null}}"#,
        )
        .unwrap();
        assert_eq!(parsed.name, "");
        let signals: Vec<&str> = parsed.signals().collect();
        assert_eq!(signals, vec!["pg-conn"]);
    }

    #[test]
    fn env_signals_include_secret_names() {
        let env = EnvVar {
            name: "PASSWORD".to_string(),
            value: None,
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(KeyRef {
                    name: "pg-main-conn-credential".to_string(),
                    key: "password".to_string(),
                }),
                config_map_key_ref: None,
            }),
        };
        let signals: Vec<&str> = env.signals().collect();
        assert_eq!(signals, vec!["pg-main-conn-credential"]);
    }

    #[test]
    fn direction_tokens() {
        assert_eq!(Direction::from_token("TD"), Some(Direction::TopBottom));
        assert_eq!(Direction::from_token("RL"), Some(Direction::RightLeft));
        assert!(Direction::RightLeft.is_horizontal());
        assert!(Direction::BottomTop.is_mirrored());
        assert_eq!(Direction::from_token("XY"), None);
    }
}
