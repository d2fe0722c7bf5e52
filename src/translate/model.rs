//! Intermediate pattern and query part state collected while walking a cypher query.

use crate::cypher::{Direction, PatternRange};
use crate::pgsql::{Expression, Identifier, OrderBy};

use super::constraints::ConstraintTracker;
use super::errors::{TranslationError, TranslationResult};
use super::scope::BindingId;

/// Which search a variable length step compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSearch {
    /// Every path within the depth range, via a recursive CTE
    Exhaustive,
    Shortest,
    AllShortest,
}

#[derive(Debug, Clone)]
pub struct Expansion {
    /// `ex0`, the recursive CTE
    pub binding: BindingId,
    /// `ep0`, the edge id array of each expanded path
    pub path_binding: BindingId,
    pub min_depth: i64,
    pub max_depth: Option<i64>,
    pub search: PathSearch,
}

impl Expansion {
    pub fn new(
        binding: BindingId,
        path_binding: BindingId,
        range: &PatternRange,
        search: PathSearch,
    ) -> TranslationResult<Self> {
        let min_depth = range.start.unwrap_or(1);

        if min_depth < 1 {
            return Err(TranslationError::unsupported(
                "zero length expansions are unsupported",
            ));
        }

        if let Some(max_depth) = range.end {
            if max_depth < min_depth {
                return Err(TranslationError::unsupported(format!(
                    "expansion range *{min_depth}..{max_depth} is empty"
                )));
            }
        }

        Ok(Self {
            binding,
            path_binding,
            min_depth,
            max_depth: range.end,
            search,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TraversalStep {
    pub direction: Direction,
    pub left_node: BindingId,
    pub edge: BindingId,
    pub right_node: BindingId,
    pub expansion: Option<Expansion>,
}

impl TraversalStep {
    /// Swaps the endpoints and reverses the direction. The matched rows are unchanged.
    pub fn flip_nodes(&mut self) {
        std::mem::swap(&mut self.left_node, &mut self.right_node);
        self.direction = self.direction.reverse();
    }
}

/// A pattern element as seen by the walker, before steps are assembled
#[derive(Debug, Clone)]
pub enum PatternElement {
    Node(BindingId),
    Edge {
        binding: BindingId,
        direction: Direction,
        expansion: Option<Expansion>,
    },
}

#[derive(Debug, Default)]
pub struct PatternPart {
    pub path_binding: Option<BindingId>,
    pub search: Option<PathSearch>,
    pub elements: Vec<PatternElement>,
    /// Kind and inline property constraints of this part's bindings
    pub constraints: ConstraintTracker,
    /// Nodes bound outside of this part, only tracked for pattern predicates
    pub external: Vec<BindingId>,
}

impl PatternPart {
    pub fn nodes(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.elements.iter().filter_map(|element| match element {
            PatternElement::Node(binding) => Some(*binding),
            PatternElement::Edge { .. } => None,
        })
    }

    pub fn is_traversal(&self) -> bool {
        self.elements.len() > 1
    }

    /// Pairs each edge with the nodes on either side of it
    pub fn traversal_steps(&self) -> TranslationResult<Vec<TraversalStep>> {
        let mut steps = Vec::new();
        let mut elements = self.elements.iter();

        let Some(PatternElement::Node(mut left_node)) = elements.next().cloned() else {
            return Err(TranslationError::malformed(
                "expected a pattern part to start with a node pattern",
            ));
        };

        while let Some(element) = elements.next() {
            let PatternElement::Edge {
                binding,
                direction,
                expansion,
            } = element
            else {
                return Err(TranslationError::malformed(
                    "expected node and relationship patterns to alternate",
                ));
            };

            let Some(PatternElement::Node(right_node)) = elements.next() else {
                return Err(TranslationError::malformed(
                    "expected a relationship pattern to be followed by a node pattern",
                ));
            };

            steps.push(TraversalStep {
                direction: *direction,
                left_node,
                edge: *binding,
                right_node: *right_node,
                expansion: expansion.clone(),
            });

            left_node = *right_node;
        }

        Ok(steps)
    }
}

#[derive(Debug, Default)]
pub struct Pattern {
    pub parts: Vec<PatternPart>,
}

impl Pattern {
    pub fn current_part_mut(&mut self) -> TranslationResult<&mut PatternPart> {
        self.parts
            .last_mut()
            .ok_or_else(|| TranslationError::malformed("no pattern part is being collected"))
    }
}

/// An item of a RETURN or WITH projection
#[derive(Debug, Clone)]
pub struct ProjectionItem {
    pub expression: Expression,
    /// Cypher alias given with `AS`
    pub alias: Option<Identifier>,
    /// Binding this item projects or defines
    pub binding: Option<BindingId>,
}

#[derive(Debug, Default)]
pub struct Projection {
    pub distinct: bool,
    pub items: Vec<ProjectionItem>,
    pub order_by: Vec<OrderBy>,
    pub skip: Option<Expression>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct PropertyAssignment {
    pub key: String,
    pub value: Expression,
}

/// Pending changes to one node or edge
#[derive(Debug, Clone)]
pub struct Update {
    pub target: BindingId,
    /// Fresh binding the `UPDATE ... RETURNING` row is projected as
    pub update_binding: BindingId,
    pub property_assignments: Vec<PropertyAssignment>,
    pub property_removals: Vec<String>,
    pub kind_assignments: Vec<i16>,
    pub kind_removals: Vec<i16>,
}

#[derive(Debug, Clone, Copy)]
pub struct Delete {
    pub target: BindingId,
}

#[derive(Debug, Default)]
pub struct Mutations {
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
}

impl Mutations {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn update_for(&mut self, target: BindingId) -> Option<&mut Update> {
        self.updates.iter_mut().find(|update| update.target == target)
    }
}

/// State of one WITH-delimited part of a query
#[derive(Debug, Default)]
pub struct QueryPart {
    pub pattern: Pattern,
    pub projection: Projection,
    pub mutations: Mutations,
    pub mutations_built: bool,
    /// Constraints left over from reading clauses when the projection began
    pub carried_constraints: Option<Expression>,
}
