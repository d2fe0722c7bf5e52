//! The cypher AST visitor driving translation.
//!
//! Expressions are built bottom-up on the expression tree stack as the walk exits each
//! node. Reading clauses are collected into pattern parts and compiled into step CTEs when
//! their MATCH exits; projections and mutations are compiled at WITH and query part
//! boundaries.

use std::collections::HashMap;

use log::{debug, trace};
use serde_json::{Map, Value};

use crate::config::TranslatorConfig;
use crate::cypher::{
    self, walk::SyntaxNode, walk::Visitor, ArithmeticOperator, FunctionInvocation, Literal,
    MapItem, NodePattern, Properties, RelationshipPattern,
};
use crate::pgsql::{
    names, value_data_type, ArrayLiteral, CommonTableExpression, DataType, Expression,
    FutureExpression, Identifier, IdentifierSet, Literal as SqlLiteral, Operator, OrderBy,
    Parameter, Statement, TableAlias,
};

use super::errors::{TranslationError, TranslationResult};
use super::expression::ExpressionTreeTranslator;
use super::functions::translate_function;
use super::hinting::{apply_binary_expression_type_hints, rewrite_property_lookup_operator};
use super::kinds::{edge_kind_constraint, node_kind_constraint, KindMapper};
use super::model::{
    Expansion, PathSearch, PatternElement, PatternPart, ProjectionItem, QueryPart,
};
use super::parameters::ParameterNegotiator;
use super::scope::{BindingId, FrameId, Scope};

/// What the walker is currently inside of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Match,
    /// `expression_depth` is the depth at which the WHERE clause was entered
    Where { expression_depth: usize },
    Projection,
    PatternPredicate,
    Mutation,
}

/// A pattern predicate waiting for its enclosing clause to compile
#[derive(Debug)]
pub(crate) struct PendingPredicate {
    pub future: usize,
    pub part: PatternPart,
}

/// Translates a single cypher query. One instance compiles exactly one query.
pub struct Translator<'c> {
    pub(crate) config: &'c TranslatorConfig,
    pub(crate) kind_mapper: &'c dyn KindMapper,
    pub(crate) negotiator: &'c dyn ParameterNegotiator,
    pub(crate) supplied_parameters: &'c Map<String, Value>,

    pub(crate) scope: Scope,
    pub(crate) tree: ExpressionTreeTranslator,
    pub(crate) ctes: Vec<CommonTableExpression>,
    pub(crate) query_parts: Vec<QueryPart>,
    pub(crate) states: Vec<State>,
    pub(crate) expression_depth: usize,

    /// Bound parameters keyed by their `pi` identifier
    pub(crate) parameters: Map<String, Value>,
    parameter_bindings: HashMap<String, BindingId>,

    pub(crate) predicate: Option<PatternPart>,
    pub(crate) pending_predicates: Vec<PendingPredicate>,
    next_future: usize,

    pub(crate) statement: Option<Statement>,
}

impl<'c> Translator<'c> {
    pub fn new(
        config: &'c TranslatorConfig,
        kind_mapper: &'c dyn KindMapper,
        negotiator: &'c dyn ParameterNegotiator,
        supplied_parameters: &'c Map<String, Value>,
    ) -> Self {
        Self {
            config,
            kind_mapper,
            negotiator,
            supplied_parameters,
            scope: Scope::new(),
            tree: ExpressionTreeTranslator::new(),
            ctes: Vec::new(),
            query_parts: Vec::new(),
            states: Vec::new(),
            expression_depth: 0,
            parameters: Map::new(),
            parameter_bindings: HashMap::new(),
            predicate: None,
            pending_predicates: Vec::new(),
            next_future: 0,
            statement: None,
        }
    }

    /// Walks `query` and returns the compiled statement with its bound parameters
    pub fn translate(
        mut self,
        query: &cypher::RegularQuery,
    ) -> TranslationResult<(Statement, Map<String, Value>)> {
        cypher::walk::walk(SyntaxNode::RegularQuery(query), &mut self)?;

        let statement = self
            .statement
            .take()
            .ok_or_else(|| TranslationError::malformed("translation produced no statement"))?;

        Ok((statement, self.parameters))
    }

    pub(crate) fn current_query_part(&mut self) -> TranslationResult<&mut QueryPart> {
        self.query_parts
            .last_mut()
            .ok_or_else(|| TranslationError::malformed("no query part is being translated"))
    }

    pub(crate) fn current_frame_required(&self, context: &str) -> TranslationResult<FrameId> {
        self.scope.current_frame_id().ok_or_else(|| {
            TranslationError::malformed(format!("{context} requires a preceding reading clause"))
        })
    }

    pub(crate) fn is_bound(&self, binding: BindingId) -> bool {
        self.scope.binding(binding).last_projection.is_some()
    }

    pub(crate) fn identifier(&self, binding: BindingId) -> Identifier {
        self.scope.identifier(binding).clone()
    }

    pub(crate) fn map_kinds(&self, kinds: &[String]) -> TranslationResult<Vec<i16>> {
        Ok(self.kind_mapper.map_kinds(kinds)?)
    }

    /// Appends the compiled query for `frame` to the CTE chain
    pub(crate) fn emit_frame(&mut self, frame: FrameId, query: crate::pgsql::Query) {
        let name = self.scope.frame_identifier(frame).clone();
        self.emit_cte(name, query);
    }

    pub(crate) fn emit_cte(&mut self, name: Identifier, query: crate::pgsql::Query) {
        debug!("emitting cte {name}");

        self.ctes.push(CommonTableExpression {
            alias: TableAlias { name, shape: None },
            materialized: false,
            query,
        });
    }

    /// Binds `value` as a new `pi` parameter
    pub(crate) fn bind_parameter(&mut self, value: Value) -> TranslationResult<Parameter> {
        let binding = self.scope.define_new(DataType::Parameter)?;
        let identifier = self.identifier(binding);

        let cast_type = match value_data_type(&value) {
            DataType::Null | DataType::Unknown => DataType::Unset,
            known => known,
        };

        let parameter = Parameter {
            identifier: identifier.clone(),
            cast_type,
            value: value.clone(),
        };

        self.scope.binding_mut(binding).parameter = Some(parameter.clone());
        self.parameters.insert(identifier.to_string(), value);

        Ok(parameter)
    }

    fn in_state(&self, state: State) -> bool {
        self.states.last() == Some(&state)
    }

    fn pop_state(&mut self) -> TranslationResult<State> {
        self.states
            .pop()
            .ok_or_else(|| TranslationError::malformed("translator state stack is empty"))
    }

    /// True when the expression being exited sits at the top level of a WHERE clause
    fn is_constraint_root(&self) -> bool {
        matches!(
            self.states.last(),
            Some(State::Where { expression_depth }) if self.expression_depth == expression_depth + 1
        )
    }

    fn enter_node(&mut self, node: SyntaxNode<'_>) -> TranslationResult<()> {
        match node {
            SyntaxNode::SinglePartQuery(_) | SyntaxNode::MultiPartQueryPart(_) => {
                debug!("entering query part {}", self.query_parts.len());
                self.query_parts.push(QueryPart::default());
            }

            SyntaxNode::Match(match_clause) => {
                if match_clause.optional {
                    return Err(TranslationError::unsupported(
                        "OPTIONAL MATCH is not supported",
                    ));
                }

                self.states.push(State::Match);
            }

            SyntaxNode::Unwind(_) => {
                return Err(TranslationError::unsupported("UNWIND is not supported"));
            }

            SyntaxNode::Create(_) => {
                return Err(TranslationError::unsupported("CREATE is not supported"));
            }

            SyntaxNode::Where(_) => self.states.push(State::Where {
                expression_depth: self.expression_depth,
            }),

            SyntaxNode::PatternPart(part) => self.enter_pattern_part(part)?,

            SyntaxNode::With(_) => {
                self.build_mutations()?;

                let carried = self.tree.consume_all().map(|constraint| constraint.expression);
                self.current_query_part()?.carried_constraints = carried;
            }

            SyntaxNode::Return(_) => self.build_mutations()?,

            SyntaxNode::Projection(projection) => {
                self.current_query_part()?.projection.distinct = projection.distinct;
                self.states.push(State::Projection);
            }

            SyntaxNode::Set(_) | SyntaxNode::Remove(_) | SyntaxNode::Delete(_) => {
                self.states.push(State::Mutation)
            }

            SyntaxNode::Expression(expression) => {
                self.expression_depth += 1;

                if let cypher::Expression::PatternPredicate(_) = expression {
                    self.states.push(State::PatternPredicate);
                    self.predicate = Some(PatternPart::default());
                }
            }

            SyntaxNode::RegularQuery(_)
            | SyntaxNode::MultiPartQuery(_)
            | SyntaxNode::UpdatingClause(_)
            | SyntaxNode::SetItem(_)
            | SyntaxNode::RemoveItem(_)
            | SyntaxNode::ProjectionItem(_)
            | SyntaxNode::Order(_)
            | SyntaxNode::SortItem(_)
            | SyntaxNode::Skip(_)
            | SyntaxNode::Limit(_)
            | SyntaxNode::NodePattern(_)
            | SyntaxNode::RelationshipPattern(_)
            | SyntaxNode::Properties(_)
            | SyntaxNode::MapItem(_)
            | SyntaxNode::PropertyLookup(_)
            | SyntaxNode::PartialComparison(_)
            | SyntaxNode::PartialArithmetic(_) => {}
        }

        Ok(())
    }

    fn exit_node(&mut self, node: SyntaxNode<'_>) -> TranslationResult<()> {
        match node {
            SyntaxNode::SinglePartQuery(query) => {
                self.build_mutations()?;
                self.build_tail(query.return_clause.is_some())?;
            }

            SyntaxNode::Match(_) => {
                self.pop_state()?;
                self.compile_match()?;
            }

            SyntaxNode::Where(_) => {
                self.tree.pop_remaining_as_constraints()?;
                self.pop_state()?;
            }

            SyntaxNode::PatternPart(_) => self.exit_pattern_part()?,
            SyntaxNode::NodePattern(node) => self.translate_node_pattern(node)?,
            SyntaxNode::RelationshipPattern(relationship) => {
                self.translate_relationship_pattern(relationship)?
            }

            SyntaxNode::Projection(_) => {
                self.pop_state()?;
            }

            SyntaxNode::ProjectionItem(item) => self.translate_projection_item(item)?,

            SyntaxNode::SortItem(item) => {
                let expression = self.tree.pop_operand()?;

                self.current_query_part()?.projection.order_by.push(OrderBy {
                    expression,
                    ascending: item.ascending,
                });
            }

            SyntaxNode::Skip(_) => {
                let skip = self.tree.pop_operand()?;
                self.current_query_part()?.projection.skip = Some(skip);
            }

            SyntaxNode::Limit(_) => {
                let limit = self.tree.pop_operand()?;
                self.current_query_part()?.projection.limit = Some(limit);
            }

            SyntaxNode::With(with) => self.build_with(with.where_clause.is_some())?,

            SyntaxNode::Set(_) | SyntaxNode::Remove(_) => {
                self.pop_state()?;
            }

            SyntaxNode::SetItem(item) => self.translate_set_item(item)?,
            SyntaxNode::RemoveItem(item) => self.translate_remove_item(item)?,

            SyntaxNode::Delete(delete) => {
                self.translate_delete(delete)?;
                self.pop_state()?;
            }

            // SET and REMOVE targets: the atom pushed for the lookup is not an operand
            SyntaxNode::PropertyLookup(_) => {
                self.tree.pop()?;
            }

            SyntaxNode::PartialComparison(_) => {}

            SyntaxNode::PartialArithmetic(partial) => {
                self.tree
                    .complete_binary_expression(&self.scope, partial.operator.into(), false)?;
            }

            SyntaxNode::Expression(expression) => {
                self.translate_expression(expression)?;
                self.expression_depth -= 1;
            }

            SyntaxNode::RegularQuery(_)
            | SyntaxNode::MultiPartQuery(_)
            | SyntaxNode::MultiPartQueryPart(_)
            | SyntaxNode::UpdatingClause(_)
            | SyntaxNode::Return(_)
            | SyntaxNode::Order(_)
            | SyntaxNode::Properties(_)
            | SyntaxNode::MapItem(_)
            | SyntaxNode::Unwind(_)
            | SyntaxNode::Create(_) => {}
        }

        Ok(())
    }

    fn translate_expression(&mut self, expression: &cypher::Expression) -> TranslationResult<()> {
        let constraint_root = self.is_constraint_root();

        match expression {
            cypher::Expression::Variable(variable) => {
                let binding = self.scope.lookup_string(&variable.symbol).ok_or_else(|| {
                    TranslationError::unresolved(format!(
                        "unable to find identifier {}",
                        variable.symbol
                    ))
                })?;

                self.tree
                    .push(Expression::identifier(self.scope.identifier(binding)));
            }

            cypher::Expression::Parameter(parameter) => {
                let parameter = self.translate_parameter(parameter)?;
                self.tree.push(Expression::Parameter(parameter));
            }

            cypher::Expression::Literal(literal) => {
                self.tree.push(translate_literal(literal).into());
            }

            cypher::Expression::List(values) => {
                let values = self.tree.pop_operands(values.len())?;
                let array = translate_list(values)?;

                self.tree.push(array);
            }

            cypher::Expression::PropertyLookup(lookup) => {
                let atom = self.tree.pop()?;
                let expression = self.translate_property_lookup(atom, &lookup.symbol)?;

                self.tree.push(expression);
            }

            cypher::Expression::FunctionInvocation(invocation) => {
                self.translate_function_invocation(invocation)?
            }

            cypher::Expression::Parenthetical(_) => self.tree.complete_parenthetical()?,
            cypher::Expression::Negation(_) => self.tree.complete_negation()?,

            cypher::Expression::Conjunction(operands) => {
                for _ in 1..operands.len() {
                    self.tree
                        .complete_binary_expression(&self.scope, Operator::And, constraint_root)?;
                }
            }

            cypher::Expression::Disjunction(operands) => {
                for _ in 1..operands.len() {
                    self.tree
                        .complete_binary_expression(&self.scope, Operator::Or, constraint_root)?;
                }
            }

            cypher::Expression::Comparison(comparison) => {
                if comparison.partials.len() != 1 {
                    return Err(TranslationError::unsupported(
                        "chained comparisons are not supported",
                    ));
                }

                self.tree.complete_binary_expression(
                    &self.scope,
                    comparison.partials[0].operator.into(),
                    false,
                )?;
            }

            // Each partial completes as it exits
            cypher::Expression::Arithmetic(_) => {}

            cypher::Expression::UnaryAddOrSubtract(unary) => {
                if unary.operator == ArithmeticOperator::Subtract {
                    let operand = self.tree.pop_operand()?;
                    self.tree.push(Expression::unary(Operator::Subtract, operand));
                }
            }

            cypher::Expression::KindMatcher(matcher) => {
                let reference = self.tree.pop()?;
                let constraint = self.translate_kind_matcher(reference, &matcher.kinds)?;

                self.tree.push(constraint);
            }

            cypher::Expression::PatternPredicate(_) => self.exit_pattern_predicate()?,
        }

        Ok(())
    }

    fn translate_parameter(&mut self, parameter: &cypher::Parameter) -> TranslationResult<Parameter> {
        if let Some(binding) = self.parameter_bindings.get(&parameter.symbol) {
            return self.scope.binding(*binding).parameter.clone().ok_or_else(|| {
                TranslationError::malformed(format!(
                    "parameter binding for ${} carries no value",
                    parameter.symbol
                ))
            });
        }

        let value = if parameter.value.is_null() {
            self.supplied_parameters
                .get(&parameter.symbol)
                .cloned()
                .unwrap_or(Value::Null)
        } else {
            parameter.value.clone()
        };

        let negotiated = self.negotiator.negotiate(&parameter.symbol, &value)?;
        let bound = self.bind_parameter(negotiated)?;

        if let Some(binding) = self.scope.lookup(&bound.identifier) {
            self.parameter_bindings
                .insert(parameter.symbol.clone(), binding);
        }

        trace!("bound parameter ${} as {}", parameter.symbol, bound.identifier);
        Ok(bound)
    }

    fn translate_property_lookup(
        &self,
        atom: Expression,
        symbol: &str,
    ) -> TranslationResult<Expression> {
        let Expression::Identifier(identifier) = atom else {
            return Err(TranslationError::unsupported(
                "property lookups are only supported on variables",
            ));
        };

        let binding = self.scope.lookup(&identifier).ok_or_else(|| {
            TranslationError::unresolved(format!("unable to find identifier {identifier}"))
        })?;

        let data_type = self.scope.binding(binding).data_type;
        if !data_type.matches_one_of(&[
            DataType::NodeComposite,
            DataType::ExpansionRootNode,
            DataType::ExpansionTerminalNode,
            DataType::EdgeComposite,
        ]) {
            return Err(TranslationError::unsupported(format!(
                "property lookup {identifier}.{symbol} on type {data_type} is not supported"
            )));
        }

        Ok(Expression::binary(
            Operator::PropertyLookup,
            Expression::column(&identifier, names::COLUMN_PROPERTIES),
            Expression::text(symbol),
        ))
    }

    fn translate_function_invocation(
        &mut self,
        invocation: &FunctionInvocation,
    ) -> TranslationResult<()> {
        let arguments = self.tree.pop_operands(invocation.arguments.len())?;
        let expression = translate_function(&self.scope, invocation, arguments)?;

        self.tree.push(expression);
        Ok(())
    }

    fn translate_kind_matcher(
        &self,
        reference: Expression,
        kinds: &[String],
    ) -> TranslationResult<Expression> {
        let Expression::Identifier(identifier) = reference else {
            return Err(TranslationError::unsupported(
                "kind matchers are only supported on variables",
            ));
        };

        let binding = self.scope.lookup(&identifier).ok_or_else(|| {
            TranslationError::unresolved(format!("unable to find identifier {identifier}"))
        })?;

        let ids = self.map_kinds(kinds)?;

        match self.scope.binding(binding).data_type {
            DataType::NodeComposite
            | DataType::ExpansionRootNode
            | DataType::ExpansionTerminalNode => Ok(node_kind_constraint(&identifier, &ids)),
            DataType::EdgeComposite => Ok(edge_kind_constraint(&identifier, &ids)),
            other => Err(TranslationError::incompatible(format!(
                "unable to match kinds of {identifier} with type {other}"
            ))),
        }
    }

    fn enter_pattern_part(&mut self, part: &cypher::PatternPart) -> TranslationResult<()> {
        let search = if part.all_shortest_paths {
            Some(PathSearch::AllShortest)
        } else if part.shortest_path {
            Some(PathSearch::Shortest)
        } else {
            None
        };

        let path_binding = match &part.variable {
            Some(variable) => {
                let binding = self.scope.define_new(DataType::PathComposite)?;
                self.scope
                    .alias(Identifier::from(variable.symbol.as_str()), binding);
                Some(binding)
            }
            None => None,
        };

        self.current_query_part()?.pattern.parts.push(PatternPart {
            path_binding,
            search,
            ..Default::default()
        });

        Ok(())
    }

    /// Links a named path to the bindings it is assembled from
    fn exit_pattern_part(&mut self) -> TranslationResult<()> {
        let part = self.current_query_part()?.pattern.current_part_mut()?;
        let Some(path_binding) = part.path_binding else {
            return Ok(());
        };

        let mut dependencies = Vec::new();
        for element in &part.elements {
            match element {
                PatternElement::Edge {
                    expansion: Some(expansion),
                    ..
                } => dependencies.push(expansion.path_binding),
                PatternElement::Edge { binding, .. } => dependencies.push(*binding),
                PatternElement::Node(_) => {}
            }
        }

        if dependencies.is_empty() {
            dependencies.extend(part.nodes().take(1));
        }

        for dependency in dependencies {
            self.scope.depend_on(path_binding, dependency);
        }

        Ok(())
    }

    /// Pops the values of an inline property map, paired with their keys
    fn pop_property_values(
        &mut self,
        properties: &Option<Properties>,
    ) -> TranslationResult<Vec<(String, Expression)>> {
        match properties {
            None => Ok(Vec::new()),
            Some(Properties::Parameter(_)) => Err(TranslationError::unsupported(
                "parameterized property maps in patterns are not supported",
            )),
            Some(Properties::Map(items)) => {
                let values = self.tree.pop_operands(items.len())?;

                Ok(items
                    .iter()
                    .map(|MapItem { key, .. }| key.clone())
                    .zip(values)
                    .collect())
            }
        }
    }

    /// Records a constraint for a pattern element of either the pattern predicate being
    /// collected or the current MATCH
    fn constrain_pattern(&mut self, identifier: &Identifier, expression: Expression) {
        let dependencies = IdentifierSet::of(&[identifier]);

        match self.predicate.as_mut() {
            Some(predicate) if self.states.last() == Some(&State::PatternPredicate) => {
                predicate.constraints.constrain(dependencies, expression)
            }
            _ => self.tree.constrain_translation(dependencies, expression),
        }
    }

    fn constrain_properties(
        &mut self,
        identifier: &Identifier,
        values: Vec<(String, Expression)>,
    ) -> TranslationResult<()> {
        for (key, value) in values {
            let lookup = Expression::binary(
                Operator::PropertyLookup,
                Expression::column(identifier, names::COLUMN_PROPERTIES),
                Expression::text(key),
            );

            let mut constraint = Expression::equals(lookup, value);
            apply_binary_expression_type_hints(&mut constraint)?;

            self.constrain_pattern(identifier, constraint);
        }

        Ok(())
    }

    fn push_pattern_element(&mut self, element: PatternElement) -> TranslationResult<()> {
        if self.in_state(State::PatternPredicate) {
            let predicate = self.predicate.as_mut().ok_or_else(|| {
                TranslationError::malformed("no pattern predicate is being collected")
            })?;

            predicate.elements.push(element);
            return Ok(());
        }

        self.current_query_part()?
            .pattern
            .current_part_mut()?
            .elements
            .push(element);

        Ok(())
    }

    fn translate_node_pattern(&mut self, node: &NodePattern) -> TranslationResult<()> {
        let property_values = self.pop_property_values(&node.properties)?;
        let in_predicate = self.in_state(State::PatternPredicate);

        let existing = node
            .variable
            .as_ref()
            .and_then(|variable| self.scope.lookup_string(&variable.symbol));

        let binding = match existing {
            Some(binding) => {
                let data_type = self.scope.binding(binding).data_type;

                if !data_type.matches_one_of(&[
                    DataType::NodeComposite,
                    DataType::ExpansionRootNode,
                    DataType::ExpansionTerminalNode,
                ]) {
                    return Err(TranslationError::incompatible(format!(
                        "{} is bound to type {data_type} and can not be used as a node",
                        self.scope.identifier(binding)
                    )));
                }

                if in_predicate {
                    if let Some(predicate) = self.predicate.as_mut() {
                        predicate.external.push(binding);
                    }
                }

                binding
            }

            None => {
                let binding = self.scope.define_new(DataType::NodeComposite)?;

                if let (Some(variable), false) = (&node.variable, in_predicate) {
                    self.scope
                        .alias(Identifier::from(variable.symbol.as_str()), binding);
                }

                binding
            }
        };

        let identifier = self.identifier(binding);

        if !node.kinds.is_empty() {
            let ids = self.map_kinds(&node.kinds)?;
            self.constrain_pattern(&identifier, node_kind_constraint(&identifier, &ids));
        }

        self.constrain_properties(&identifier, property_values)?;
        self.push_pattern_element(PatternElement::Node(binding))
    }

    fn translate_relationship_pattern(
        &mut self,
        relationship: &RelationshipPattern,
    ) -> TranslationResult<()> {
        let property_values = self.pop_property_values(&relationship.properties)?;
        let in_predicate = self.in_state(State::PatternPredicate);

        if in_predicate && relationship.range.is_some() {
            return Err(TranslationError::unsupported(
                "variable length relationships inside pattern predicates are not supported",
            ));
        }

        let search = if in_predicate {
            None
        } else {
            self.current_query_part()?.pattern.current_part_mut()?.search
        };

        if let Some(variable) = &relationship.variable {
            if self.scope.lookup_string(&variable.symbol).is_some() {
                return Err(TranslationError::unsupported(format!(
                    "relationship variable {} is already bound",
                    variable.symbol
                )));
            }
        }

        let expanded = relationship.range.is_some() || search.is_some();
        let data_type = if expanded {
            DataType::ExpansionEdge
        } else {
            DataType::EdgeComposite
        };

        let binding = self.scope.define_new(data_type)?;
        if let (Some(variable), false) = (&relationship.variable, in_predicate) {
            self.scope
                .alias(Identifier::from(variable.symbol.as_str()), binding);
        }

        let expansion = if expanded {
            let expansion_binding = self.scope.define_new(DataType::ExpansionPattern)?;
            let path_binding = self.scope.define_new(DataType::ExpansionPath)?;

            self.scope.depend_on(binding, expansion_binding);
            self.scope.depend_on(path_binding, expansion_binding);

            Some(Expansion::new(
                expansion_binding,
                path_binding,
                &relationship.range.unwrap_or_default(),
                search.unwrap_or(PathSearch::Exhaustive),
            )?)
        } else {
            None
        };

        let identifier = self.identifier(binding);

        if !relationship.kinds.is_empty() {
            let ids = self.map_kinds(&relationship.kinds)?;
            self.constrain_pattern(&identifier, edge_kind_constraint(&identifier, &ids));
        }

        self.constrain_properties(&identifier, property_values)?;
        self.push_pattern_element(PatternElement::Edge {
            binding,
            direction: relationship.direction,
            expansion,
        })
    }

    /// Replaces a finished pattern predicate with a future resolved once the enclosing
    /// clause compiles
    fn exit_pattern_predicate(&mut self) -> TranslationResult<()> {
        if self.pop_state()? != State::PatternPredicate {
            return Err(TranslationError::malformed(
                "expected to exit a pattern predicate",
            ));
        }

        let part = self
            .predicate
            .take()
            .ok_or_else(|| TranslationError::malformed("no pattern predicate is being collected"))?;

        let dependencies: IdentifierSet = part
            .external
            .iter()
            .map(|binding| self.identifier(*binding))
            .collect();

        let future = self.next_future;
        self.next_future += 1;

        trace!("deferring pattern predicate {future} on {dependencies}");

        self.pending_predicates.push(PendingPredicate { future, part });
        self.tree.push(Expression::Future(FutureExpression {
            id: future,
            dependencies,
            data_type: DataType::Boolean,
        }));

        Ok(())
    }

    /// Compiles every pending pattern predicate and substitutes it for its future
    pub(crate) fn resolve_pending_predicates(&mut self) -> TranslationResult<()> {
        for pending in std::mem::take(&mut self.pending_predicates) {
            let exists = self.compile_pattern_predicate(pending.part)?;
            let mut resolved = self.tree.resolve_future(pending.future, &exists);

            if let Some(part) = self.query_parts.last_mut() {
                for item in &mut part.projection.items {
                    resolved |= item.expression.resolve_future(pending.future, &exists);
                }

                for order in &mut part.projection.order_by {
                    resolved |= order.expression.resolve_future(pending.future, &exists);
                }

                if let Some(carried) = &mut part.carried_constraints {
                    resolved |= carried.resolve_future(pending.future, &exists);
                }
            }

            if !resolved {
                return Err(TranslationError::malformed(format!(
                    "pattern predicate {} is not referenced by any expression",
                    pending.future
                )));
            }
        }

        Ok(())
    }

    fn compile_match(&mut self) -> TranslationResult<()> {
        self.resolve_pending_predicates()?;

        let parts = std::mem::take(&mut self.current_query_part()?.pattern.parts);
        for part in parts {
            self.compile_pattern_part(part)?;
        }

        Ok(())
    }

    fn translate_projection_item(&mut self, item: &cypher::ProjectionItem) -> TranslationResult<()> {
        // Projected property lookups keep their JSONB type
        let expression = match self.tree.peek() {
            Some(Expression::Binary(binary)) if binary.operator == Operator::PropertyLookup => {
                rewrite_property_lookup_operator(self.tree.pop()?, DataType::Jsonb)
            }
            _ => self.tree.pop_operand()?,
        };
        let alias = item
            .binding
            .as_ref()
            .map(|variable| Identifier::from(variable.symbol.as_str()));

        let mut binding = match &expression {
            Expression::Identifier(identifier) => self.scope.lookup(identifier),
            _ => None,
        };

        match (binding, &alias) {
            (Some(existing), Some(alias)) => self.scope.alias(alias.clone(), existing),

            // Computed items are bound so later clauses can refer to them by alias
            (None, Some(alias)) => {
                let data_type = match &expression {
                    Expression::Binary(binary) if binary.operator == Operator::JsonField => {
                        DataType::Jsonb
                    }
                    other => super::hinting::infer_expression_type(other)
                        .unwrap_or(DataType::Unknown),
                };
                let projected = self.scope.define_projection(data_type);

                self.scope.alias(alias.clone(), projected);
                binding = Some(projected);
            }

            _ => {}
        }

        self.current_query_part()?
            .projection
            .items
            .push(ProjectionItem {
                expression,
                alias,
                binding,
            });

        Ok(())
    }
}

impl<'a> Visitor<'a> for Translator<'_> {
    type Error = TranslationError;

    fn enter(&mut self, node: SyntaxNode<'a>) -> Result<(), Self::Error> {
        trace!("enter {}", node.kind_name());
        self.enter_node(node)
    }

    fn exit(&mut self, node: SyntaxNode<'a>) -> Result<(), Self::Error> {
        trace!("exit {}", node.kind_name());
        self.exit_node(node)
    }
}

fn translate_literal(literal: &Literal) -> SqlLiteral {
    match literal {
        Literal::Null => SqlLiteral::null(),
        Literal::Bool(value) => SqlLiteral::boolean(*value),
        Literal::Int(value) => SqlLiteral::int8(*value),
        Literal::Float(value) => SqlLiteral::float8(*value),
        Literal::String(value) => SqlLiteral::text(value.clone()),
    }
}

/// `array [..]` typed by its elements. Mixed element types are rejected.
fn translate_list(values: Vec<Expression>) -> TranslationResult<Expression> {
    if values.is_empty() {
        return Ok(Expression::ArrayLiteral(ArrayLiteral {
            values,
            cast_type: DataType::TextArray,
        }));
    }

    let mut element_type: Option<DataType> = None;
    let mut unknown = false;

    for value in &values {
        match value.type_hint() {
            Some(DataType::Null) => {}
            Some(hint) => {
                element_type = match element_type {
                    None => Some(hint),
                    Some(current) => Some(current.convert(hint).ok_or_else(|| {
                        TranslationError::incompatible(format!(
                            "list elements of types {current} and {hint} can not be combined"
                        ))
                    })?),
                };
            }
            None => unknown = true,
        }
    }

    let cast_type = match (element_type, unknown) {
        (Some(element_type), false) => element_type.to_array_type().unwrap_or(DataType::Unset),
        _ => DataType::Unset,
    };

    Ok(Expression::ArrayLiteral(ArrayLiteral { values, cast_type }))
}
