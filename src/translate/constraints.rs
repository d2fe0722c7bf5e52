//! Constraint isolation.
//!
//! A WHERE clause is broken into independent predicates, each keyed by the set of
//! identifiers it references. Pattern compilation later asks for everything that is
//! satisfiable by the identifiers visible at a given join and receives the conjunction
//! of exactly those predicates. Consumed constraints are removed from the tracker.

use log::trace;

use crate::pgsql::{conjoin, Expression, IdentifierSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub dependencies: IdentifierSet,
    pub expression: Expression,
}

impl Constraint {
    pub fn new(dependencies: IdentifierSet, expression: Expression) -> Self {
        Self {
            dependencies,
            expression,
        }
    }

    /// Conjoins `expression` in front of this constraint's existing expression
    fn merge(&mut self, expression: Expression) {
        let existing = std::mem::replace(&mut self.expression, Expression::Wildcard);
        self.expression = Expression::and(expression, existing);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintTracker {
    constraints: Vec<Constraint>,
}

impl ConstraintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Records `expression` under `dependencies`. A constraint with an identical
    /// dependency set is extended with AND instead of being duplicated.
    pub fn constrain(&mut self, dependencies: IdentifierSet, expression: Expression) {
        trace!("constraining {dependencies}");

        if let Some(existing) = self
            .constraints
            .iter_mut()
            .find(|constraint| constraint.dependencies.matches(&dependencies))
        {
            existing.merge(expression);
        } else {
            self.constraints.push(Constraint::new(dependencies, expression));
        }
    }

    fn is_consumable(constraint: &Constraint, visible: &IdentifierSet) -> bool {
        visible.satisfies(&constraint.dependencies) && !constraint.expression.has_unresolved_future()
    }

    /// True when at least one constraint could be consumed for `visible`
    pub fn has_constraints(&self, visible: &IdentifierSet) -> bool {
        self.constraints
            .iter()
            .any(|constraint| Self::is_consumable(constraint, visible))
    }

    /// Removes and conjoins, in insertion order, every constraint whose dependencies are
    /// all in `visible`
    pub fn consume_set(&mut self, visible: &IdentifierSet) -> Option<Constraint> {
        let (consumed, retained): (Vec<_>, Vec<_>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|constraint| Self::is_consumable(constraint, visible));

        self.constraints = retained;
        Self::combine(consumed)
    }

    /// Removes and conjoins every constraint that does not embed an unresolved future
    pub fn consume_all(&mut self) -> Option<Constraint> {
        let (consumed, retained): (Vec<_>, Vec<_>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|constraint| !constraint.expression.has_unresolved_future());

        self.constraints = retained;
        Self::combine(consumed)
    }

    fn combine(consumed: Vec<Constraint>) -> Option<Constraint> {
        let mut dependencies = IdentifierSet::new();
        let mut expressions = Vec::with_capacity(consumed.len());

        for constraint in consumed {
            dependencies.add_set(&constraint.dependencies);
            expressions.push(constraint.expression);
        }

        conjoin(expressions).map(|expression| Constraint::new(dependencies, expression))
    }

    /// Substitutes the compiled expression for future `id` in every tracked constraint
    pub fn resolve_future(&mut self, id: usize, replacement: &Expression) -> bool {
        let mut resolved = false;

        for constraint in &mut self.constraints {
            resolved |= constraint.expression.resolve_future(id, replacement);
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgsql::{DataType, FutureExpression, Identifier, Literal, Operator, ToSql};

    fn ident(value: &str) -> Identifier {
        Identifier::from(value)
    }

    fn lookup_equals(root: &str, key: &str, value: &str) -> Expression {
        Expression::equals(
            Expression::binary(
                Operator::JsonTextField,
                Expression::column(&ident(root), "properties"),
                Expression::text(key),
            ),
            Expression::text(value),
        )
    }

    #[test]
    fn test_consume_set_isolates_by_dependency() {
        let mut tracker = ConstraintTracker::new();

        tracker.constrain(IdentifierSet::of(&[&ident("a")]), lookup_equals("a", "x", "1"));
        tracker.constrain(IdentifierSet::of(&[&ident("b")]), lookup_equals("b", "y", "2"));
        tracker.constrain(
            IdentifierSet::of(&[&ident("a"), &ident("b")]),
            Expression::equals(
                Expression::column(&ident("a"), "id"),
                Expression::column(&ident("b"), "id"),
            ),
        );

        let a = tracker.consume_set(&IdentifierSet::of(&[&ident("a")])).unwrap();
        assert_eq!(a.expression.to_sql().unwrap(), "a.properties ->> 'x' = '1'");
        assert!(tracker.consume_set(&IdentifierSet::of(&[&ident("a")])).is_none());

        let b = tracker.consume_set(&IdentifierSet::of(&[&ident("b")])).unwrap();
        assert_eq!(b.expression.to_sql().unwrap(), "b.properties ->> 'y' = '2'");

        let both = tracker
            .consume_set(&IdentifierSet::of(&[&ident("a"), &ident("b")]))
            .unwrap();
        assert_eq!(both.expression.to_sql().unwrap(), "a.id = b.id");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_matching_dependencies_merge() {
        let mut tracker = ConstraintTracker::new();
        let a = IdentifierSet::of(&[&ident("a")]);

        tracker.constrain(a.clone(), lookup_equals("a", "x", "1"));
        tracker.constrain(a.clone(), lookup_equals("a", "y", "2"));

        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.consume_all().unwrap().expression.to_sql().unwrap(),
            "a.properties ->> 'y' = '2' and a.properties ->> 'x' = '1'"
        );
    }

    #[test]
    fn test_futures_are_withheld_until_resolved() {
        let mut tracker = ConstraintTracker::new();
        let a = IdentifierSet::of(&[&ident("a")]);

        tracker.constrain(
            a.clone(),
            Expression::Future(FutureExpression {
                id: 0,
                dependencies: a.clone(),
                data_type: DataType::Boolean,
            }),
        );

        assert!(!tracker.has_constraints(&a));
        assert!(tracker.consume_set(&a).is_none());
        assert!(tracker.consume_all().is_none());

        assert!(tracker.resolve_future(0, &Literal::boolean(true).into()));
        assert!(tracker.has_constraints(&a));
        assert_eq!(
            tracker.consume_set(&a).unwrap().expression.to_sql().unwrap(),
            "true"
        );
    }
}
