use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single SQL identifier
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Identifier(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `self.column`
    pub fn column(&self, column: &Identifier) -> CompoundIdentifier {
        CompoundIdentifier(vec![self.clone(), column.clone()])
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier(value)
    }
}

/// Dot-separated identifier path such as `n0.properties`
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct CompoundIdentifier(pub Vec<Identifier>);

impl CompoundIdentifier {
    pub fn new(parts: &[&str]) -> Self {
        CompoundIdentifier(parts.iter().map(|part| Identifier::from(*part)).collect())
    }

    pub fn root(&self) -> Option<&Identifier> {
        self.0.first()
    }

    /// Last segment. For `n0.properties` this is `properties`.
    pub fn column(&self) -> Option<&Identifier> {
        if self.0.len() > 1 {
            self.0.last()
        } else {
            None
        }
    }
}

impl fmt::Display for CompoundIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(Identifier::as_str).collect();
        f.write_str(&parts.join("."))
    }
}

/// Ordered set of identifiers
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierSet(BTreeSet<Identifier>);

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(identifiers: &[&Identifier]) -> Self {
        IdentifierSet(identifiers.iter().map(|identifier| (*identifier).clone()).collect())
    }

    pub fn add(&mut self, identifier: Identifier) -> &mut Self {
        self.0.insert(identifier);
        self
    }

    pub fn add_set(&mut self, other: &IdentifierSet) -> &mut Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    pub fn remove(&mut self, identifier: &Identifier) -> bool {
        self.0.remove(identifier)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.0.contains(identifier)
    }

    /// True when every member of `other` is also a member of this set
    pub fn satisfies(&self, other: &IdentifierSet) -> bool {
        other.0.is_subset(&self.0)
    }

    pub fn matches(&self, other: &IdentifierSet) -> bool {
        self.0 == other.0
    }

    pub fn union(&self, other: &IdentifierSet) -> IdentifierSet {
        IdentifierSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<Identifier> for IdentifierSet {
    fn from_iter<T: IntoIterator<Item = Identifier>>(iter: T) -> Self {
        IdentifierSet(iter.into_iter().collect())
    }
}

impl fmt::Display for IdentifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(Identifier::as_str).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Table and column names of the graph storage schema and compiler-owned relations
pub mod names {
    use super::Identifier;

    pub fn identifier(value: &str) -> Identifier {
        Identifier::from(value)
    }

    pub const TABLE_NODE: &str = "node";
    pub const TABLE_EDGE: &str = "edge";

    pub const COLUMN_ID: &str = "id";
    pub const COLUMN_PROPERTIES: &str = "properties";
    pub const COLUMN_KIND_IDS: &str = "kind_ids";
    pub const COLUMN_KIND_ID: &str = "kind_id";
    pub const COLUMN_START_ID: &str = "start_id";
    pub const COLUMN_END_ID: &str = "end_id";
    pub const COLUMN_GRAPH_ID: &str = "graph_id";

    pub const EXPANSION_ROOT_ID: &str = "root_id";
    pub const EXPANSION_NEXT_ID: &str = "next_id";
    pub const EXPANSION_DEPTH: &str = "depth";
    pub const EXPANSION_SATISFIED: &str = "satisfied";
    pub const EXPANSION_IS_CYCLE: &str = "is_cycle";
    pub const EXPANSION_PATH: &str = "path";

    /// Working table consumed by the shortest path harness functions
    pub const EXPANSION_NEXT_FRONT: &str = "next_front";
    pub const EXPANSION_FORWARD_FRONT: &str = "forward_front";

    /// Identifiers that never refer to a compiler binding
    pub fn is_reserved(identifier: &Identifier) -> bool {
        matches!(
            identifier.as_str(),
            TABLE_NODE
                | TABLE_EDGE
                | COLUMN_ID
                | COLUMN_PROPERTIES
                | COLUMN_KIND_IDS
                | COLUMN_KIND_ID
                | COLUMN_START_ID
                | COLUMN_END_ID
                | COLUMN_GRAPH_ID
                | EXPANSION_NEXT_FRONT
                | EXPANSION_FORWARD_FRONT
        )
    }
}
