//! Version-independent view over solc AST output and abstract contract detection.
//!
//! solc has emitted several incompatible AST encodings over its lifetime. Each one is normalized
//! into [`AstNode`] and checked against a table of [`AbstractMarker`]s, so supporting a new
//! encoding means adding a marker rather than touching the callers.

use serde_json::{Map, Value};

/// Node kind used for contract definitions after normalization.
pub const CONTRACT_KIND: &str = "Contract";

/// A normalized AST node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstNode {
    /// Node kind (`Contract`, `Identifier`, `UserDefinedTypeName`, ...)
    pub kind: String,
    /// Scalar and structured attributes of the node
    pub attributes: Map<String, Value>,
    /// Child nodes in source order
    pub children: Vec<AstNode>,
}

impl AstNode {
    /// Builds a node from either the legacy (`name`/`attributes`/`children`) or the compact
    /// (`nodeType`/`nodes`) JSON encoding.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else { return Self::default() };

        if let Some(node_type) = object.get("nodeType").and_then(Value::as_str) {
            let attributes = object
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "nodeType" | "nodes"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            return Self {
                kind: normalize_kind(node_type),
                attributes,
                children: children_of(object, "nodes"),
            };
        }

        Self {
            kind: normalize_kind(object.get("name").and_then(Value::as_str).unwrap_or_default()),
            attributes: object
                .get("attributes")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            children: children_of(object, "children"),
        }
    }

    /// Returns the string attribute `key`, if present.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Returns true if this node defines a contract.
    pub fn is_contract(&self) -> bool {
        self.kind == CONTRACT_KIND
    }

    fn has_child(&self, kind: &str, attribute: &str, value: &str) -> bool {
        self.children
            .iter()
            .any(|child| child.kind == kind && child.attr_str(attribute) == Some(value))
    }
}

/// Later solc releases call contract nodes `ContractDefinition` in both encodings.
fn normalize_kind(kind: &str) -> String {
    match kind {
        "ContractDefinition" => CONTRACT_KIND.to_string(),
        other => other.to_string(),
    }
}

fn children_of(object: &Map<String, Value>, key: &str) -> Vec<AstNode> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter().map(AstNode::from_json).collect())
        .unwrap_or_default()
}

/// One way of recognizing an abstract contract definition.
pub trait AbstractMarker: std::fmt::Debug + Send + Sync {
    /// Returns true if `contract` is marked abstract under this encoding.
    fn matches(&self, contract: &AstNode) -> bool;
}

/// The contract itself is named `abstract`.
#[derive(Debug)]
struct NamedAbstract;

impl AbstractMarker for NamedAbstract {
    fn matches(&self, contract: &AstNode) -> bool {
        contract.attr_str("name") == Some("abstract")
    }
}

/// A direct child of `kind` whose `attribute` is the identifier `abstract`.
///
/// solc <= 0.2.0 encodes the `is abstract` base as an `Identifier` with a `value` attribute,
/// later releases as a `UserDefinedTypeName` with a `name` attribute.
#[derive(Debug)]
struct AbstractBase {
    kind: &'static str,
    attribute: &'static str,
}

impl AbstractMarker for AbstractBase {
    fn matches(&self, contract: &AstNode) -> bool {
        contract.has_child(self.kind, self.attribute, "abstract")
    }
}

/// Compact AST: explicit `abstract` flag or an interface definition.
#[derive(Debug)]
struct CompactAbstractFlag;

impl AbstractMarker for CompactAbstractFlag {
    fn matches(&self, contract: &AstNode) -> bool {
        contract.attributes.get("abstract").and_then(Value::as_bool).unwrap_or(false) ||
            contract.attr_str("contractKind") == Some("interface")
    }
}

/// `fullyImplemented: false`, emitted by both encodings for contracts with unimplemented functions.
#[derive(Debug)]
struct NotFullyImplemented;

impl AbstractMarker for NotFullyImplemented {
    fn matches(&self, contract: &AstNode) -> bool {
        contract.attributes.get("fullyImplemented").and_then(Value::as_bool) == Some(false)
    }
}

/// Every known encoding of "this contract is abstract".
pub static ABSTRACT_MARKERS: &[&dyn AbstractMarker] = &[
    &NamedAbstract,
    &AbstractBase { kind: "Identifier", attribute: "value" },
    &AbstractBase { kind: "UserDefinedTypeName", attribute: "name" },
    &CompactAbstractFlag,
    &NotFullyImplemented,
];

/// Returns true if any known marker flags `contract` as abstract.
pub fn is_abstract(contract: &AstNode) -> bool {
    ABSTRACT_MARKERS.iter().any(|marker| marker.matches(contract))
}

/// A contract definition found in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDefinition {
    /// Contract name
    pub name: String,
    /// Whether the definition is abstract
    pub is_abstract: bool,
}

/// Collects every contract definition under `node`, innermost first.
pub fn extract_contracts(node: &AstNode) -> Vec<ContractDefinition> {
    let mut contracts: Vec<_> = node.children.iter().flat_map(extract_contracts).collect();
    if node.is_contract() {
        contracts.push(ContractDefinition {
            name: node.attr_str("name").unwrap_or_default().to_string(),
            is_abstract: is_abstract(node),
        });
    }
    contracts
}

/// Names of the concrete (non-abstract) contracts defined under `node`.
pub fn concrete_contracts(node: &AstNode) -> Vec<String> {
    extract_contracts(node).into_iter().filter(|c| !c.is_abstract).map(|c| c.name).collect()
}
