//! Postfix expression assembly.
//!
//! The translator pushes operands as it exits leaf nodes of the cypher tree and asks
//! this builder to complete an operator once both operands are on the stack. Top level
//! conjunctions of a WHERE clause are not assembled into one expression: each operand is
//! moved into a [`ConstraintTracker`] keyed by the identifiers it references.

use log::trace;

use crate::pgsql::{
    names, BinaryExpression, DataType, Expression, FunctionCall, IdentifierSet,
    Literal, LiteralValue, Operator,
};

use super::constraints::{Constraint, ConstraintTracker};
use super::errors::{TranslationError, TranslationResult};
use super::hinting::{
    apply_binary_expression_type_hints, apply_unary_expression_type_hints,
    infer_expression_type, is_property_lookup, rewrite_jsonb_value_operands,
    rewrite_property_lookup_operator, type_cast_expression,
};
use super::scope::Scope;

/// Identifiers referenced by `expression`, including those of embedded futures
pub fn extract_syntax_node_references(expression: &Expression) -> IdentifierSet {
    let mut references = IdentifierSet::new();

    expression.visit(&mut |node| match node {
        Expression::Identifier(identifier) if !names::is_reserved(identifier) => {
            references.add(identifier.clone());
        }
        Expression::CompoundIdentifier(identifier) => {
            if let Some(root) = identifier.root() {
                if !names::is_reserved(root) {
                    references.add(root.clone());
                }
            }
        }
        Expression::Future(future) => {
            references.add_set(&future.dependencies);
        }
        _ => {}
    });

    references
}

#[derive(Debug, Default)]
pub struct ExpressionTreeTranslator {
    stack: Vec<Expression>,
    pub user_constraints: ConstraintTracker,
    pub translation_constraints: ConstraintTracker,
}

impl ExpressionTreeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn peek(&self) -> Option<&Expression> {
        self.stack.last()
    }

    pub fn push(&mut self, expression: Expression) {
        trace!("push {expression:?}");
        self.stack.push(expression);
    }

    pub fn pop(&mut self) -> TranslationResult<Expression> {
        self.stack
            .pop()
            .ok_or_else(|| TranslationError::malformed("expected an operand on the expression stack"))
    }

    /// Pops the top operand with type hints applied
    pub fn pop_operand(&mut self) -> TranslationResult<Expression> {
        let mut operand = self.pop()?;

        match &operand {
            Expression::Binary(_) => apply_binary_expression_type_hints(&mut operand)?,
            Expression::Unary(_) => apply_unary_expression_type_hints(&mut operand),
            _ => {}
        }

        Ok(operand)
    }

    /// Pops `count` operands, returned in push order
    pub fn pop_operands(&mut self, count: usize) -> TranslationResult<Vec<Expression>> {
        let mut operands = (0..count)
            .map(|_| self.pop_operand())
            .collect::<TranslationResult<Vec<_>>>()?;

        operands.reverse();
        Ok(operands)
    }

    /// Records a user constraint keyed by the identifiers it references
    pub fn constrain(&mut self, expression: Expression) {
        let dependencies = extract_syntax_node_references(&expression);
        self.user_constraints.constrain(dependencies, expression);
    }

    /// Records a compiler-generated constraint such as a kind or inline property filter
    pub fn constrain_translation(&mut self, dependencies: IdentifierSet, expression: Expression) {
        self.translation_constraints.constrain(dependencies, expression);
    }

    /// Pops the top operand and records it as a user constraint. A bare property lookup
    /// is treated as a boolean.
    pub fn pop_operand_as_constraint(&mut self) -> TranslationResult<()> {
        let mut operand = self.pop_operand()?;

        if is_property_lookup(&operand) {
            operand = rewrite_property_lookup_operator(operand, DataType::Boolean);
        }

        self.constrain(operand);
        Ok(())
    }

    /// Moves every remaining operand into the user constraints
    pub fn pop_remaining_as_constraints(&mut self) -> TranslationResult<()> {
        while !self.stack.is_empty() {
            self.pop_operand_as_constraint()?;
        }

        Ok(())
    }

    pub fn has_constraints(&self, visible: &IdentifierSet) -> bool {
        self.user_constraints.has_constraints(visible)
            || self.translation_constraints.has_constraints(visible)
    }

    /// Consumes translation then user constraints satisfiable by `visible`
    pub fn consume_set(&mut self, visible: &IdentifierSet) -> Option<Constraint> {
        merge_constraints(
            self.translation_constraints.consume_set(visible),
            self.user_constraints.consume_set(visible),
        )
    }

    pub fn consume_all(&mut self) -> Option<Constraint> {
        merge_constraints(
            self.translation_constraints.consume_all(),
            self.user_constraints.consume_all(),
        )
    }

    pub fn resolve_future(&mut self, id: usize, replacement: &Expression) -> bool {
        let user = self.user_constraints.resolve_future(id, replacement);
        let translation = self.translation_constraints.resolve_future(id, replacement);

        user || translation
    }

    /// Wraps the top operand in parentheses
    pub fn complete_parenthetical(&mut self) -> TranslationResult<()> {
        let inner = self.pop_operand()?;
        self.push(Expression::parenthetical(inner));
        Ok(())
    }

    /// Wraps the top operand in `not`
    pub fn complete_negation(&mut self) -> TranslationResult<()> {
        let operand = self.pop_operand()?;
        let mut negation = Expression::not(coalesce_pattern_match_operand(operand));

        apply_unary_expression_type_hints(&mut negation);
        self.push(negation);
        Ok(())
    }

    /// Combines the top two operands with `operator`. When `constraint_root` is set the
    /// operation belongs to the top level of a WHERE clause and AND operands are moved
    /// into the constraint tracker instead.
    pub fn complete_binary_expression(
        &mut self,
        scope: &Scope,
        operator: Operator,
        constraint_root: bool,
    ) -> TranslationResult<()> {
        match operator {
            Operator::And if constraint_root => self.pop_operand_as_constraint(),
            Operator::Or if constraint_root => self.constrain_disjoint_operand_pair(scope),
            _ => {
                let expression = self.assemble_binary_expression(scope, operator)?;
                self.push(expression);
                Ok(())
            }
        }
    }

    fn constrain_disjoint_operand_pair(&mut self, scope: &Scope) -> TranslationResult<()> {
        let disjunction = self.assemble_binary_expression(scope, Operator::Or)?;

        if self.stack.is_empty() {
            self.constrain(disjunction);
        } else {
            self.push(disjunction);
        }

        Ok(())
    }

    fn assemble_binary_expression(
        &mut self,
        scope: &Scope,
        operator: Operator,
    ) -> TranslationResult<Expression> {
        let right = self.pop_operand()?;
        let left = self.pop_operand()?;

        let mut binary = BinaryExpression {
            operator,
            left,
            right,
        };

        rewrite_identity_operands(scope, &mut binary)?;
        rewrite_projected_jsonb_operands(scope, &mut binary)?;

        let mut expression = Expression::Binary(Box::new(binary));
        apply_binary_expression_type_hints(&mut expression)?;

        let Expression::Binary(binary) = expression else {
            return Err(TranslationError::malformed("expected a binary expression"));
        };

        let mut expression = rewrite_binary_expression(*binary)?;
        apply_binary_expression_type_hints(&mut expression)?;

        // Arithmetic must type check; comparisons short circuit to boolean
        infer_expression_type(&expression)?;
        Ok(expression)
    }
}

fn merge_constraints(
    translation: Option<Constraint>,
    user: Option<Constraint>,
) -> Option<Constraint> {
    match (translation, user) {
        (Some(translation), Some(user)) => Some(Constraint::new(
            translation.dependencies.union(&user.dependencies),
            Expression::and(translation.expression, user.expression),
        )),
        (translation, None) => translation,
        (None, user) => user,
    }
}

fn is_node_type(data_type: DataType) -> bool {
    data_type.matches_one_of(&[
        DataType::NodeComposite,
        DataType::ExpansionRootNode,
        DataType::ExpansionTerminalNode,
    ])
}

fn is_edge_type(data_type: DataType) -> bool {
    data_type.matches_one_of(&[DataType::EdgeComposite, DataType::ExpansionEdge])
}

fn is_projected_jsonb(scope: &Scope, expression: &Expression) -> bool {
    match expression {
        Expression::Identifier(identifier) => scope
            .lookup(identifier)
            .is_some_and(|binding| scope.binding(binding).data_type == DataType::Jsonb),
        _ => false,
    }
}

/// Aliased property values are carried between frames as JSONB and have to be read back
/// out before they meet a typed operand
pub fn rewrite_projected_jsonb_operands(
    scope: &Scope,
    binary: &mut BinaryExpression,
) -> TranslationResult<()> {
    let left_jsonb = is_projected_jsonb(scope, &binary.left);
    let right_jsonb = is_projected_jsonb(scope, &binary.right);

    rewrite_jsonb_value_operands(binary, left_jsonb, right_jsonb)
}

/// Rewrites a comparison between two graph entity identifiers into a comparison of their
/// `id` columns
pub fn rewrite_identity_operands(scope: &Scope, binary: &mut BinaryExpression) -> TranslationResult<()> {
    if !matches!(binary.operator, Operator::Equals | Operator::NotEquals) {
        return Ok(());
    }

    let (Expression::Identifier(left), Expression::Identifier(right)) = (&binary.left, &binary.right)
    else {
        return Ok(());
    };

    let left_type = scope
        .lookup(left)
        .map(|binding| scope.binding(binding).data_type)
        .ok_or_else(|| TranslationError::unresolved(format!("unable to find identifier {left}")))?;
    let right_type = scope
        .lookup(right)
        .map(|binding| scope.binding(binding).data_type)
        .ok_or_else(|| TranslationError::unresolved(format!("unable to find identifier {right}")))?;

    if (is_node_type(left_type) && is_node_type(right_type))
        || (is_edge_type(left_type) && is_edge_type(right_type))
    {
        let (left, right) = (
            Expression::column(left, names::COLUMN_ID),
            Expression::column(right, names::COLUMN_ID),
        );

        binary.left = left;
        binary.right = right;
        return Ok(());
    }

    if left_type == DataType::PathComposite || right_type == DataType::PathComposite {
        return Err(TranslationError::unsupported(
            "comparison for path identifiers is unsupported",
        ));
    }

    if left_type.is_composite() || right_type.is_composite() {
        if left_type.is_array() || right_type.is_array() {
            return Err(TranslationError::unsupported(
                "comparison for composite array identifiers is unsupported",
            ));
        }

        return Err(TranslationError::incompatible(format!(
            "invalid comparison between types {left_type} and {right_type}"
        )));
    }

    Ok(())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn is_text_or_unknown(data_type: DataType) -> bool {
    matches!(data_type, DataType::Text | DataType::Unknown | DataType::Unset)
}

/// Lowers cypher-only operators into their PostgreSQL forms
pub fn rewrite_binary_expression(mut binary: BinaryExpression) -> TranslationResult<Expression> {
    match binary.operator {
        Operator::Add => {
            let left = infer_expression_type(&binary.left)?;
            let right = infer_expression_type(&binary.right)?;

            let concatenates = left.is_array()
                || right.is_array()
                || (is_text_or_unknown(left)
                    && is_text_or_unknown(right)
                    && (left == DataType::Text || right == DataType::Text));

            if concatenates {
                binary.operator = Operator::Concatenate;
            }

            Ok(Expression::Binary(Box::new(binary)))
        }

        Operator::CypherStartsWith | Operator::CypherEndsWith | Operator::CypherContains => {
            rewrite_pattern_match(binary)
        }

        Operator::CypherRegexMatch => {
            binary.operator = Operator::RegexMatch;
            Ok(Expression::Binary(Box::new(binary)))
        }

        Operator::Is | Operator::IsNot => Ok(rewrite_null_check(binary)),

        Operator::In => rewrite_membership(binary),

        _ => Ok(Expression::Binary(Box::new(binary))),
    }
}

fn rewrite_pattern_match(mut binary: BinaryExpression) -> TranslationResult<Expression> {
    let operator = binary.operator;

    if let Expression::Binary(left) = &binary.left {
        if !left.operator.is_property_lookup() {
            return Err(TranslationError::unsupported(format!(
                "unexpected operator {} for left operand of {operator}",
                left.operator
            )));
        }
    }

    let (prefix, suffix) = match operator {
        Operator::CypherStartsWith => (false, true),
        Operator::CypherEndsWith => (true, false),
        _ => (true, true),
    };

    binary.right = match std::mem::replace(&mut binary.right, Expression::Wildcard) {
        Expression::Literal(Literal {
            value: LiteralValue::String(value),
            ..
        }) => {
            let mut pattern = escape_like(&value);

            if prefix {
                pattern.insert(0, '%');
            }

            if suffix {
                pattern.push('%');
            }

            Expression::text(pattern)
        }

        Expression::Literal(literal) => {
            return Err(TranslationError::incompatible(format!(
                "expected a text literal for operator {operator} but found {}",
                literal.cast_type
            )));
        }

        operand => {
            let operand = match operand {
                Expression::Parenthetical(_) => type_cast_expression(operand, DataType::Text),
                operand if is_property_lookup(&operand) => Expression::parenthetical(
                    rewrite_property_lookup_operator(operand, DataType::Text),
                ),
                operand => operand,
            };

            let mut pattern = operand;

            if prefix {
                pattern = Expression::binary(Operator::Concatenate, Expression::text("%"), pattern);
            }

            if suffix {
                pattern = Expression::binary(Operator::Concatenate, pattern, Expression::text("%"));
            }

            pattern
        }
    };

    binary.operator = Operator::Like;
    Ok(Expression::Binary(Box::new(binary)))
}

/// `n.x is null` becomes a key existence test on the properties column
fn rewrite_null_check(binary: BinaryExpression) -> Expression {
    let right_is_null = matches!(&binary.right, Expression::Literal(literal) if literal.is_null());

    match (&binary.left, right_is_null) {
        (Expression::Binary(lookup), true) if lookup.operator.is_property_lookup() => {
            let exists = Expression::binary(
                Operator::JsonbFieldExists,
                lookup.left.clone(),
                lookup.right.clone(),
            );

            if binary.operator == Operator::Is {
                Expression::not(Expression::parenthetical(exists))
            } else {
                exists
            }
        }
        _ => Expression::Binary(Box::new(binary)),
    }
}

fn rewrite_membership(binary: BinaryExpression) -> TranslationResult<Expression> {
    let BinaryExpression { left, right, .. } = binary;
    let left_type = infer_expression_type(&left)?;

    if let Some(right_type) = right.type_hint() {
        if left_type.is_array() {
            return Ok(Expression::binary(Operator::PgArrayOverlap, left, right));
        }

        return Ok(Expression::equals(left, Expression::any(right, right_type)));
    }

    let cast_type = left_type.to_array_type().unwrap_or(DataType::Unset);
    Ok(Expression::equals(left, Expression::any(right, cast_type)))
}

/// A negated pattern match on a missing property must still evaluate to true
fn coalesce_pattern_match_operand(operand: Expression) -> Expression {
    let wrap = |mut binary: Box<BinaryExpression>| {
        if matches!(binary.operator, Operator::Like | Operator::ILike)
            && is_property_lookup(&binary.left)
        {
            let lookup = std::mem::replace(&mut binary.left, Expression::Wildcard);
            binary.left = FunctionCall::new(
                "coalesce",
                vec![lookup, Expression::text("")],
                DataType::Text,
            )
            .into();
        }

        binary
    };

    match operand {
        Expression::Binary(binary) => Expression::Binary(wrap(binary)),
        Expression::Parenthetical(inner) => match *inner {
            Expression::Binary(binary) => Expression::parenthetical(Expression::Binary(wrap(binary))),
            inner => Expression::parenthetical(inner),
        },
        operand => operand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pgsql::{Identifier, ToSql};

    fn ident(value: &str) -> Identifier {
        Identifier::from(value)
    }

    fn push_lookup(tree: &mut ExpressionTreeTranslator, root: &str, key: &str) {
        tree.push(Expression::binary(
            Operator::PropertyLookup,
            Expression::column(&ident(root), "properties"),
            Expression::text(key),
        ));
    }

    fn scope_with(bindings: &[(&str, DataType)]) -> Scope {
        let mut scope = Scope::new();

        for (name, data_type) in bindings {
            scope.define(ident(name), *data_type);
        }

        scope
    }

    #[test]
    fn test_expression_tree_translator() {
        let scope = scope_with(&[("a", DataType::NodeComposite), ("b", DataType::NodeComposite)]);
        let mut tree = ExpressionTreeTranslator::new();

        // a.name = 'a' and b.name = 'b' and a.num_a > 1 and a.other = b.other, as a
        // four operand conjunction at the root of a WHERE clause
        push_lookup(&mut tree, "a", "name");
        tree.push(Expression::text("a"));
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();

        push_lookup(&mut tree, "b", "name");
        tree.push(Expression::text("b"));
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();

        push_lookup(&mut tree, "a", "num_a");
        tree.push(Expression::int8(1));
        tree.complete_binary_expression(&scope, Operator::GreaterThan, false).unwrap();

        push_lookup(&mut tree, "a", "other");
        push_lookup(&mut tree, "b", "other");
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();

        for _ in 0..3 {
            tree.complete_binary_expression(&scope, Operator::And, true).unwrap();
        }

        tree.pop_remaining_as_constraints().unwrap();
        assert_eq!(tree.depth(), 0);

        let a = tree.consume_set(&IdentifierSet::of(&[&ident("a")])).unwrap();
        assert_eq!(
            a.expression.to_sql().unwrap(),
            "a.properties ->> 'name' = 'a' and (a.properties ->> 'num_a')::int8 > 1"
        );

        let b = tree.consume_set(&IdentifierSet::of(&[&ident("b")])).unwrap();
        assert_eq!(b.expression.to_sql().unwrap(), "b.properties ->> 'name' = 'b'");

        let both = tree
            .consume_set(&IdentifierSet::of(&[&ident("a"), &ident("b")]))
            .unwrap();
        assert_eq!(
            both.expression.to_sql().unwrap(),
            "a.properties -> 'other' = b.properties -> 'other'"
        );
    }

    #[test]
    fn test_root_disjunction_is_one_constraint() {
        let scope = scope_with(&[("a", DataType::NodeComposite), ("b", DataType::NodeComposite)]);
        let mut tree = ExpressionTreeTranslator::new();

        push_lookup(&mut tree, "a", "x");
        tree.push(Expression::text("1"));
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();
        push_lookup(&mut tree, "b", "y");
        tree.push(Expression::text("2"));
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();
        tree.complete_binary_expression(&scope, Operator::Or, true).unwrap();

        assert_eq!(tree.depth(), 0);
        assert!(tree.consume_set(&IdentifierSet::of(&[&ident("a")])).is_none());
        assert_eq!(
            tree.consume_all().unwrap().expression.to_sql().unwrap(),
            "a.properties ->> 'x' = '1' or b.properties ->> 'y' = '2'"
        );
    }

    #[test]
    fn test_identity_comparison_uses_id_columns() {
        let scope = scope_with(&[
            ("n0", DataType::NodeComposite),
            ("n1", DataType::ExpansionTerminalNode),
            ("e0", DataType::EdgeComposite),
            ("p0", DataType::PathComposite),
        ]);

        let mut tree = ExpressionTreeTranslator::new();
        tree.push(Expression::identifier(&ident("n0")));
        tree.push(Expression::identifier(&ident("n1")));
        tree.complete_binary_expression(&scope, Operator::Equals, false).unwrap();
        assert_eq!(tree.pop().unwrap().to_sql().unwrap(), "n0.id = n1.id");

        tree.push(Expression::identifier(&ident("n0")));
        tree.push(Expression::identifier(&ident("e0")));
        assert!(matches!(
            tree.complete_binary_expression(&scope, Operator::Equals, false),
            Err(TranslationError::TypeIncompatibility(message))
                if message == "invalid comparison between types nodecomposite and edgecomposite"
        ));

        let mut tree = ExpressionTreeTranslator::new();
        tree.push(Expression::identifier(&ident("p0")));
        tree.push(Expression::identifier(&ident("p0")));
        assert!(matches!(
            tree.complete_binary_expression(&scope, Operator::Equals, false),
            Err(TranslationError::UnsupportedConstruct(_))
        ));

        let mut tree = ExpressionTreeTranslator::new();
        tree.push(Expression::identifier(&ident("missing")));
        tree.push(Expression::identifier(&ident("n0")));
        assert!(matches!(
            tree.complete_binary_expression(&scope, Operator::Equals, false),
            Err(TranslationError::UnresolvedIdentifier(_))
        ));
    }

    #[test]
    fn test_string_operators_become_like() {
        let scope = Scope::new();
        let cases = [
            (Operator::CypherContains, "n0.properties ->> 'name' like '%ad\\_min%'"),
            (Operator::CypherStartsWith, "n0.properties ->> 'name' like 'ad\\_min%'"),
            (Operator::CypherEndsWith, "n0.properties ->> 'name' like '%ad\\_min'"),
        ];

        for (operator, expected) in cases {
            let mut tree = ExpressionTreeTranslator::new();
            push_lookup(&mut tree, "n0", "name");
            tree.push(Expression::text("ad_min"));
            tree.complete_binary_expression(&scope, operator, false).unwrap();

            assert_eq!(tree.pop().unwrap().to_sql().unwrap(), expected);
        }

        let mut tree = ExpressionTreeTranslator::new();
        push_lookup(&mut tree, "n0", "name");
        tree.push(Expression::int8(1));
        assert!(matches!(
            tree.complete_binary_expression(&scope, Operator::CypherContains, false),
            Err(TranslationError::TypeIncompatibility(_))
        ));
    }

    #[test]
    fn test_pattern_match_against_lookup_keeps_grouping() {
        let scope = Scope::new();

        let mut tree = ExpressionTreeTranslator::new();
        push_lookup(&mut tree, "n0", "name");
        push_lookup(&mut tree, "n1", "name");
        tree.complete_binary_expression(&scope, Operator::CypherContains, false).unwrap();
        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "n0.properties ->> 'name' like '%' || (n1.properties ->> 'name') || '%'"
        );

        push_lookup(&mut tree, "n0", "name");
        push_lookup(&mut tree, "n1", "prefix");
        tree.complete_binary_expression(&scope, Operator::CypherStartsWith, false).unwrap();
        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "n0.properties ->> 'name' like (n1.properties ->> 'prefix') || '%'"
        );
    }

    #[test]
    fn test_null_checks_become_key_existence() {
        let scope = Scope::new();

        let mut tree = ExpressionTreeTranslator::new();
        push_lookup(&mut tree, "n0", "name");
        tree.push(Literal::null().into());
        tree.complete_binary_expression(&scope, Operator::Is, false).unwrap();
        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "not (n0.properties ? 'name')"
        );

        push_lookup(&mut tree, "n0", "name");
        tree.push(Literal::null().into());
        tree.complete_binary_expression(&scope, Operator::IsNot, false).unwrap();
        assert_eq!(tree.pop().unwrap().to_sql().unwrap(), "n0.properties ? 'name'");
    }

    #[test]
    fn test_membership_becomes_any() {
        let scope = Scope::new();
        let mut tree = ExpressionTreeTranslator::new();

        push_lookup(&mut tree, "n0", "name");
        tree.push(Expression::ArrayLiteral(crate::pgsql::ArrayLiteral {
            values: vec![Expression::text("a"), Expression::text("b")],
            cast_type: DataType::TextArray,
        }));
        tree.complete_binary_expression(&scope, Operator::In, false).unwrap();

        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "n0.properties ->> 'name' = any (array ['a', 'b']::text[])"
        );
    }

    #[test]
    fn test_text_addition_becomes_concatenation() {
        let scope = Scope::new();
        let mut tree = ExpressionTreeTranslator::new();

        push_lookup(&mut tree, "n0", "first");
        tree.push(Expression::text(" "));
        tree.complete_binary_expression(&scope, Operator::Add, false).unwrap();
        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "n0.properties ->> 'first' || ' '"
        );

        tree.push(Expression::text("a"));
        tree.push(Expression::int8(1));
        assert!(tree.complete_binary_expression(&scope, Operator::Add, false).is_err());
    }

    #[test]
    fn test_negated_pattern_match_coalesces_missing_properties() {
        let scope = Scope::new();
        let mut tree = ExpressionTreeTranslator::new();

        push_lookup(&mut tree, "n0", "name");
        tree.push(Expression::text("x"));
        tree.complete_binary_expression(&scope, Operator::CypherContains, false).unwrap();
        tree.complete_negation().unwrap();

        assert_eq!(
            tree.pop().unwrap().to_sql().unwrap(),
            "not coalesce(n0.properties ->> 'name', '')::text like '%x%'"
        );
    }
}
