//! Depth-first visitation of the cypher AST.
//!
//! Every node kind the translator cares about is represented by one variant of
//! [`SyntaxNode`]. [`walk`] calls [`Visitor::enter`] on a node, walks each of
//! its branches in source order and then calls [`Visitor::exit`]. Operands are
//! therefore always fully visited before the operator that combines them exits.

use super::ast::*;

#[derive(Debug, Clone, Copy)]
pub enum SyntaxNode<'a> {
    RegularQuery(&'a RegularQuery),
    SinglePartQuery(&'a SinglePartQuery),
    MultiPartQuery(&'a MultiPartQuery),
    MultiPartQueryPart(&'a MultiPartQueryPart),
    With(&'a With),
    Match(&'a Match),
    Unwind(&'a Unwind),
    UpdatingClause(&'a UpdatingClause),
    Create(&'a Create),
    Set(&'a Set),
    SetItem(&'a SetItem),
    Remove(&'a Remove),
    RemoveItem(&'a RemoveItem),
    Delete(&'a Delete),
    Return(&'a Return),
    Projection(&'a Projection),
    ProjectionItem(&'a ProjectionItem),
    Order(&'a Order),
    SortItem(&'a SortItem),
    Skip(&'a Skip),
    Limit(&'a Limit),
    Where(&'a Where),
    PatternPart(&'a PatternPart),
    NodePattern(&'a NodePattern),
    RelationshipPattern(&'a RelationshipPattern),
    Properties(&'a Properties),
    MapItem(&'a MapItem),
    PropertyLookup(&'a PropertyLookup),
    PartialComparison(&'a PartialComparison),
    PartialArithmetic(&'a PartialArithmetic),
    Expression(&'a Expression),
}

impl<'a> SyntaxNode<'a> {
    /// Short name of the node kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            SyntaxNode::RegularQuery(_) => "RegularQuery",
            SyntaxNode::SinglePartQuery(_) => "SinglePartQuery",
            SyntaxNode::MultiPartQuery(_) => "MultiPartQuery",
            SyntaxNode::MultiPartQueryPart(_) => "MultiPartQueryPart",
            SyntaxNode::With(_) => "With",
            SyntaxNode::Match(_) => "Match",
            SyntaxNode::Unwind(_) => "Unwind",
            SyntaxNode::UpdatingClause(_) => "UpdatingClause",
            SyntaxNode::Create(_) => "Create",
            SyntaxNode::Set(_) => "Set",
            SyntaxNode::SetItem(_) => "SetItem",
            SyntaxNode::Remove(_) => "Remove",
            SyntaxNode::RemoveItem(_) => "RemoveItem",
            SyntaxNode::Delete(_) => "Delete",
            SyntaxNode::Return(_) => "Return",
            SyntaxNode::Projection(_) => "Projection",
            SyntaxNode::ProjectionItem(_) => "ProjectionItem",
            SyntaxNode::Order(_) => "Order",
            SyntaxNode::SortItem(_) => "SortItem",
            SyntaxNode::Skip(_) => "Skip",
            SyntaxNode::Limit(_) => "Limit",
            SyntaxNode::Where(_) => "Where",
            SyntaxNode::PatternPart(_) => "PatternPart",
            SyntaxNode::NodePattern(_) => "NodePattern",
            SyntaxNode::RelationshipPattern(_) => "RelationshipPattern",
            SyntaxNode::Properties(_) => "Properties",
            SyntaxNode::MapItem(_) => "MapItem",
            SyntaxNode::PropertyLookup(_) => "PropertyLookup",
            SyntaxNode::PartialComparison(_) => "PartialComparison",
            SyntaxNode::PartialArithmetic(_) => "PartialArithmetic",
            SyntaxNode::Expression(expression) => match expression {
                Expression::Variable(_) => "Variable",
                Expression::Parameter(_) => "Parameter",
                Expression::Literal(_) => "Literal",
                Expression::List(_) => "ListLiteral",
                Expression::PropertyLookup(_) => "PropertyLookup",
                Expression::FunctionInvocation(_) => "FunctionInvocation",
                Expression::Parenthetical(_) => "Parenthetical",
                Expression::Negation(_) => "Negation",
                Expression::Conjunction(_) => "Conjunction",
                Expression::Disjunction(_) => "Disjunction",
                Expression::Comparison(_) => "Comparison",
                Expression::Arithmetic(_) => "Arithmetic",
                Expression::UnaryAddOrSubtract(_) => "UnaryAddOrSubtract",
                Expression::KindMatcher(_) => "KindMatcher",
                Expression::PatternPredicate(_) => "PatternPredicate",
            },
        }
    }

    /// Child nodes in visitation order
    pub fn branches(&self) -> Vec<SyntaxNode<'a>> {
        let mut branches = Vec::new();

        match *self {
            SyntaxNode::RegularQuery(query) => match &query.single_query {
                SingleQuery::SinglePart(single_part) => {
                    branches.push(SyntaxNode::SinglePartQuery(single_part))
                }
                SingleQuery::MultiPart(multi_part) => {
                    branches.push(SyntaxNode::MultiPartQuery(multi_part))
                }
            },

            SyntaxNode::MultiPartQuery(query) => {
                branches.extend(query.parts.iter().map(SyntaxNode::MultiPartQueryPart));
                branches.push(SyntaxNode::SinglePartQuery(&query.single_part_query));
            }

            SyntaxNode::MultiPartQueryPart(part) => {
                branches.extend(part.reading_clauses.iter().map(reading_clause_node));
                branches.extend(part.updating_clauses.iter().map(SyntaxNode::UpdatingClause));
                branches.push(SyntaxNode::With(&part.with));
            }

            SyntaxNode::SinglePartQuery(query) => {
                branches.extend(query.reading_clauses.iter().map(reading_clause_node));
                branches.extend(query.updating_clauses.iter().map(SyntaxNode::UpdatingClause));

                if let Some(return_clause) = &query.return_clause {
                    branches.push(SyntaxNode::Return(return_clause));
                }
            }

            SyntaxNode::With(with) => {
                branches.push(SyntaxNode::Projection(&with.projection));

                if let Some(where_clause) = &with.where_clause {
                    branches.push(SyntaxNode::Where(where_clause));
                }
            }

            SyntaxNode::Match(match_clause) => {
                branches.extend(match_clause.pattern.iter().map(SyntaxNode::PatternPart));

                if let Some(where_clause) = &match_clause.where_clause {
                    branches.push(SyntaxNode::Where(where_clause));
                }
            }

            SyntaxNode::UpdatingClause(clause) => match clause {
                UpdatingClause::Set(set) => branches.push(SyntaxNode::Set(set)),
                UpdatingClause::Remove(remove) => branches.push(SyntaxNode::Remove(remove)),
                UpdatingClause::Delete(delete) => branches.push(SyntaxNode::Delete(delete)),
                UpdatingClause::Create(create) => branches.push(SyntaxNode::Create(create)),
            },

            SyntaxNode::Set(set) => branches.extend(set.items.iter().map(SyntaxNode::SetItem)),

            SyntaxNode::SetItem(item) => {
                if let SetItem::Property { target, value } = item {
                    branches.push(SyntaxNode::PropertyLookup(target));
                    branches.push(SyntaxNode::Expression(value));
                }
            }

            SyntaxNode::Remove(remove) => {
                branches.extend(remove.items.iter().map(SyntaxNode::RemoveItem))
            }

            SyntaxNode::RemoveItem(item) => {
                if let RemoveItem::Property(lookup) = item {
                    branches.push(SyntaxNode::PropertyLookup(lookup));
                }
            }

            SyntaxNode::Delete(delete) => {
                branches.extend(delete.expressions.iter().map(SyntaxNode::Expression))
            }

            SyntaxNode::Return(return_clause) => {
                branches.push(SyntaxNode::Projection(&return_clause.projection))
            }

            SyntaxNode::Projection(projection) => {
                branches.extend(projection.items.iter().map(SyntaxNode::ProjectionItem));

                if let Some(order) = &projection.order {
                    branches.push(SyntaxNode::Order(order));
                }

                if let Some(skip) = &projection.skip {
                    branches.push(SyntaxNode::Skip(skip));
                }

                if let Some(limit) = &projection.limit {
                    branches.push(SyntaxNode::Limit(limit));
                }
            }

            SyntaxNode::ProjectionItem(item) => {
                branches.push(SyntaxNode::Expression(&item.expression))
            }

            SyntaxNode::Order(order) => {
                branches.extend(order.items.iter().map(SyntaxNode::SortItem))
            }

            SyntaxNode::SortItem(item) => branches.push(SyntaxNode::Expression(&item.expression)),
            SyntaxNode::Skip(skip) => branches.push(SyntaxNode::Expression(&skip.value)),
            SyntaxNode::Limit(limit) => branches.push(SyntaxNode::Expression(&limit.value)),

            SyntaxNode::Where(where_clause) => {
                branches.extend(where_clause.expressions.iter().map(SyntaxNode::Expression))
            }

            SyntaxNode::PatternPart(part) => {
                branches.extend(part.elements.iter().map(pattern_element_node))
            }

            SyntaxNode::NodePattern(node) => {
                if let Some(properties) = &node.properties {
                    branches.push(SyntaxNode::Properties(properties));
                }
            }

            SyntaxNode::RelationshipPattern(relationship) => {
                if let Some(properties) = &relationship.properties {
                    branches.push(SyntaxNode::Properties(properties));
                }
            }

            SyntaxNode::Properties(properties) => {
                if let Properties::Map(items) = properties {
                    branches.extend(items.iter().map(SyntaxNode::MapItem));
                }
            }

            SyntaxNode::MapItem(item) => branches.push(SyntaxNode::Expression(&item.value)),

            SyntaxNode::PropertyLookup(lookup) => {
                branches.push(SyntaxNode::Expression(&lookup.atom))
            }

            SyntaxNode::PartialComparison(partial) => {
                branches.push(SyntaxNode::Expression(&partial.right))
            }

            SyntaxNode::PartialArithmetic(partial) => {
                branches.push(SyntaxNode::Expression(&partial.right))
            }

            SyntaxNode::Expression(expression) => match expression {
                Expression::Variable(_) | Expression::Parameter(_) | Expression::Literal(_) => {}

                Expression::List(values)
                | Expression::Conjunction(values)
                | Expression::Disjunction(values) => {
                    branches.extend(values.iter().map(SyntaxNode::Expression))
                }

                Expression::PropertyLookup(lookup) => {
                    branches.push(SyntaxNode::Expression(&lookup.atom))
                }

                Expression::FunctionInvocation(function) => {
                    branches.extend(function.arguments.iter().map(SyntaxNode::Expression))
                }

                Expression::Parenthetical(inner) | Expression::Negation(inner) => {
                    branches.push(SyntaxNode::Expression(inner))
                }

                Expression::Comparison(comparison) => {
                    branches.push(SyntaxNode::Expression(&comparison.left));
                    branches.extend(comparison.partials.iter().map(SyntaxNode::PartialComparison));
                }

                Expression::Arithmetic(arithmetic) => {
                    branches.push(SyntaxNode::Expression(&arithmetic.left));
                    branches.extend(arithmetic.partials.iter().map(SyntaxNode::PartialArithmetic));
                }

                Expression::UnaryAddOrSubtract(unary) => {
                    branches.push(SyntaxNode::Expression(&unary.operand))
                }

                Expression::KindMatcher(matcher) => {
                    branches.push(SyntaxNode::Expression(&matcher.reference))
                }

                Expression::PatternPredicate(predicate) => {
                    branches.extend(predicate.elements.iter().map(pattern_element_node))
                }
            },

            SyntaxNode::Unwind(_) | SyntaxNode::Create(_) => {}
        }

        branches
    }
}

fn reading_clause_node(clause: &ReadingClause) -> SyntaxNode<'_> {
    match clause {
        ReadingClause::Match(match_clause) => SyntaxNode::Match(match_clause),
        ReadingClause::Unwind(unwind) => SyntaxNode::Unwind(unwind),
    }
}

fn pattern_element_node(element: &PatternElement) -> SyntaxNode<'_> {
    match element {
        PatternElement::Node(node) => SyntaxNode::NodePattern(node),
        PatternElement::Relationship(relationship) => SyntaxNode::RelationshipPattern(relationship),
    }
}

/// Enter/exit callbacks driven by [`walk`]
pub trait Visitor<'a> {
    type Error;

    fn enter(&mut self, node: SyntaxNode<'a>) -> Result<(), Self::Error>;
    fn exit(&mut self, node: SyntaxNode<'a>) -> Result<(), Self::Error>;
}

/// Walks `node` depth first. The first error returned by the visitor stops the walk.
pub fn walk<'a, V: Visitor<'a>>(node: SyntaxNode<'a>, visitor: &mut V) -> Result<(), V::Error> {
    visitor.enter(node)?;

    for branch in node.branches() {
        walk(branch, visitor)?;
    }

    visitor.exit(node)
}
