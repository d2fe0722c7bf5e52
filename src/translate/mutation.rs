//! SET, REMOVE and DELETE.
//!
//! Mutations are collected while their clauses are walked and compiled once per query
//! part, before its projection. Each updated binding becomes an `update ... returning`
//! step CTE that re-projects everything the previous frame exported, with the updated
//! row standing in for the original binding. Deletes become `delete ... using ... returning`
//! step CTEs shaped the same way.

use log::{debug, warn};

use crate::cypher::{self, PropertyLookup, RemoveItem, SetItem};
use crate::pgsql::{
    names, ArrayLiteral, DataType, Delete, Expression, FromClause, FunctionCall, Identifier,
    Literal, Operator, Query, SelectItem, SetExpression, TableReference, Update,
};

use super::errors::{TranslationError, TranslationResult};
use super::hinting::{is_property_lookup, rewrite_property_lookup_operator};
use super::model::{self, PropertyAssignment};
use super::projection::{
    build_projection, edge_composite, materialize_frame, node_composite, rewrite_frame_bindings,
};
use super::scope::{BindingId, FrameId};
use super::translator::Translator;

fn table_for(data_type: DataType) -> TranslationResult<&'static str> {
    match data_type {
        DataType::NodeComposite
        | DataType::ExpansionRootNode
        | DataType::ExpansionTerminalNode => Ok(names::TABLE_NODE),
        DataType::EdgeComposite => Ok(names::TABLE_EDGE),
        other => Err(TranslationError::unsupported(format!(
            "unable to mutate a binding of type {other}"
        ))),
    }
}

fn kind_array(ids: &[i16]) -> Expression {
    Expression::ArrayLiteral(ArrayLiteral {
        values: ids.iter().map(|id| Literal::int2(*id).into()).collect(),
        cast_type: DataType::Int2Array,
    })
}

/// `properties = u.properties [- array [..]::text[]] [|| jsonb_build_object(..)::jsonb]`
fn property_assignment(
    target: &Identifier,
    assignments: Vec<PropertyAssignment>,
    removals: &[String],
) -> Option<Expression> {
    if assignments.is_empty() && removals.is_empty() {
        return None;
    }

    let mut value = Expression::column(target, names::COLUMN_PROPERTIES);

    if !removals.is_empty() {
        value = Expression::binary(
            Operator::Subtract,
            value,
            Expression::ArrayLiteral(ArrayLiteral {
                values: removals.iter().map(Expression::text).collect(),
                cast_type: DataType::TextArray,
            }),
        );
    }

    if !assignments.is_empty() {
        let parameters = assignments
            .into_iter()
            .flat_map(|assignment| [Expression::text(assignment.key), assignment.value])
            .collect();

        value = Expression::binary(
            Operator::Concatenate,
            value,
            FunctionCall::new("jsonb_build_object", parameters, DataType::Jsonb).into(),
        );
    }

    Some(Expression::binary(
        Operator::Assignment,
        Expression::identifier(&Identifier::from(names::COLUMN_PROPERTIES)),
        value,
    ))
}

/// `kind_ids = uniq(sort(u.kind_ids [- removed] || added)::int2[])::int2[]`, or a plain
/// subtraction when kinds are only removed
fn kind_assignment(target: &Identifier, added: &[i16], removed: &[i16]) -> Option<Expression> {
    let current = Expression::column(target, names::COLUMN_KIND_IDS);

    let value = match (added.is_empty(), removed.is_empty()) {
        (true, true) => return None,
        (true, false) => Expression::binary(Operator::Subtract, current, kind_array(removed)),
        (false, removed_none) => {
            let base = if removed_none {
                current
            } else {
                Expression::binary(Operator::Subtract, current, kind_array(removed))
            };

            let sorted = FunctionCall::new(
                "sort",
                vec![Expression::binary(
                    Operator::Concatenate,
                    base,
                    kind_array(added),
                )],
                DataType::Int2Array,
            );

            FunctionCall::new("uniq", vec![sorted.into()], DataType::Int2Array).into()
        }
    };

    Some(Expression::binary(
        Operator::Assignment,
        Expression::identifier(&Identifier::from(names::COLUMN_KIND_IDS)),
        value,
    ))
}

impl Translator<'_> {
    fn mutation_target(&self, reference: &cypher::Expression) -> TranslationResult<BindingId> {
        let cypher::Expression::Variable(variable) = reference else {
            return Err(TranslationError::unsupported(
                "mutation targets must be variables",
            ));
        };

        self.scope.lookup_string(&variable.symbol).ok_or_else(|| {
            TranslationError::unresolved(format!(
                "unable to find identifier {}",
                variable.symbol
            ))
        })
    }

    /// Pending update for `target`, created on first use
    fn update_for(&mut self, target: BindingId) -> TranslationResult<&mut model::Update> {
        let exists = self
            .current_query_part()?
            .mutations
            .update_for(target)
            .is_some();

        if !exists {
            let data_type = match self.scope.binding(target).data_type {
                DataType::ExpansionRootNode | DataType::ExpansionTerminalNode => {
                    DataType::NodeComposite
                }
                other => other,
            };

            table_for(data_type)?;
            let update_binding = self.scope.define_new(data_type)?;

            self.current_query_part()?.mutations.updates.push(model::Update {
                target,
                update_binding,
                property_assignments: Vec::new(),
                property_removals: Vec::new(),
                kind_assignments: Vec::new(),
                kind_removals: Vec::new(),
            });
        }

        self.current_query_part()?
            .mutations
            .update_for(target)
            .ok_or_else(|| TranslationError::malformed("pending update disappeared"))
    }

    fn require_node_target(&self, target: BindingId, operation: &str) -> TranslationResult<()> {
        if table_for(self.scope.binding(target).data_type)? != names::TABLE_NODE {
            return Err(TranslationError::unsupported(format!(
                "{operation} is only supported on nodes"
            )));
        }

        Ok(())
    }

    pub(crate) fn translate_set_item(&mut self, item: &SetItem) -> TranslationResult<()> {
        match item {
            SetItem::Property { target, value: _ } => {
                let PropertyLookup { atom, symbol } = target;

                let mut value = self.tree.pop_operand()?;
                if is_property_lookup(&value) {
                    value = rewrite_property_lookup_operator(value, DataType::Jsonb);
                }

                let binding = self.mutation_target(atom)?;
                self.update_for(binding)?
                    .property_assignments
                    .push(PropertyAssignment {
                        key: symbol.clone(),
                        value,
                    });
            }

            SetItem::Kinds { variable, kinds } => {
                let binding =
                    self.mutation_target(&cypher::Expression::Variable(variable.clone()))?;
                self.require_node_target(binding, "setting kinds")?;

                let ids = self.map_kinds(kinds)?;
                self.update_for(binding)?.kind_assignments.extend(ids);
            }
        }

        Ok(())
    }

    pub(crate) fn translate_remove_item(&mut self, item: &RemoveItem) -> TranslationResult<()> {
        match item {
            RemoveItem::Property(PropertyLookup { atom, symbol }) => {
                let binding = self.mutation_target(atom)?;
                self.update_for(binding)?
                    .property_removals
                    .push(symbol.clone());
            }

            RemoveItem::Kinds { variable, kinds } => {
                let binding =
                    self.mutation_target(&cypher::Expression::Variable(variable.clone()))?;
                self.require_node_target(binding, "removing kinds")?;

                let ids = self.map_kinds(kinds)?;
                self.update_for(binding)?.kind_removals.extend(ids);
            }
        }

        Ok(())
    }

    pub(crate) fn translate_delete(&mut self, delete: &cypher::Delete) -> TranslationResult<()> {
        if delete.detach {
            warn!("DETACH DELETE is translated as DELETE: attached edges are left to the schema");
        }

        let operands = self.tree.pop_operands(delete.expressions.len())?;

        for operand in operands {
            let Expression::Identifier(identifier) = operand else {
                return Err(TranslationError::unsupported(
                    "only variables may be deleted",
                ));
            };

            let target = self.scope.lookup(&identifier).ok_or_else(|| {
                TranslationError::unresolved(format!("unable to find identifier {identifier}"))
            })?;

            table_for(self.scope.binding(target).data_type)?;
            self.current_query_part()?
                .mutations
                .deletes
                .push(model::Delete { target });
        }

        Ok(())
    }

    /// Compiles the current part's mutations. Runs at most once per part.
    pub(crate) fn build_mutations(&mut self) -> TranslationResult<()> {
        let part = self.current_query_part()?;
        if part.mutations_built {
            return Ok(());
        }

        part.mutations_built = true;
        let mutations = std::mem::take(&mut part.mutations);

        if mutations.is_empty() {
            return Ok(());
        }

        debug!(
            "compiling {} update(s) and {} delete(s)",
            mutations.updates.len(),
            mutations.deletes.len()
        );

        for update in mutations.updates {
            self.compile_update(update)?;
        }

        for delete in mutations.deletes {
            self.compile_delete(delete)?;
        }

        Ok(())
    }

    fn compile_update(&mut self, update: model::Update) -> TranslationResult<()> {
        let previous = self.current_frame_required("SET and REMOVE")?;
        let previous_identifier = self.scope.frame_identifier(previous).clone();

        let target = self.identifier(update.target);
        let updated = self.identifier(update.update_binding);
        let data_type = self.scope.binding(update.update_binding).data_type;
        let table = table_for(data_type)?;

        let mut assignments: Vec<Expression> = property_assignment(
            &updated,
            update.property_assignments,
            &update.property_removals,
        )
        .into_iter()
        .chain(kind_assignment(
            &updated,
            &update.kind_assignments,
            &update.kind_removals,
        ))
        .collect();

        for assignment in &mut assignments {
            rewrite_frame_bindings(&self.scope, assignment);
        }

        let mut join = Expression::equals(
            Expression::column(&target, names::COLUMN_ID),
            Expression::column(&updated, names::COLUMN_ID),
        );
        rewrite_frame_bindings(&self.scope, &mut join);

        let frame = self.scope.push_frame()?;
        {
            let frame = self.scope.frame_mut(frame);
            frame.exported.remove(&target);
            frame.visible.remove(&target);
        }
        self.scope.export(&updated)?;

        if let Some(alias) = self.scope.binding(update.target).alias.clone() {
            self.scope.alias(alias, update.update_binding);
        }

        let returning = self.mutation_returning(frame, update.update_binding, table)?;

        debug!("updating {target} as {updated}");

        let statement = Update {
            table: TableReference::table(table, Some(&updated)),
            assignments,
            from: vec![FromClause::new(TableReference::named(&previous_identifier))],
            where_clause: Some(join),
            returning,
        };

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, Query::new(SetExpression::Update(Box::new(statement))));

        Ok(())
    }

    /// Re-projects everything `frame` exports, with `replacement` rendered from its
    /// mutated row
    fn mutation_returning(
        &self,
        frame: FrameId,
        replacement: BindingId,
        table: &str,
    ) -> TranslationResult<Vec<SelectItem>> {
        let exported = self.scope.frame(frame).exported.clone();
        let mut returning = Vec::with_capacity(exported.len());

        for binding in self.scope.lookup_bindings(exported.iter())? {
            let identifier = self.scope.identifier(binding);

            if binding == replacement {
                let composite = if table == names::TABLE_NODE {
                    node_composite(identifier)
                } else {
                    edge_composite(identifier)
                };

                returning.push(SelectItem::aliased(composite, identifier));
            } else {
                returning.push(build_projection(&self.scope, binding, identifier)?);
            }
        }

        Ok(returning)
    }

    fn compile_delete(&mut self, delete: model::Delete) -> TranslationResult<()> {
        let previous = self.current_frame_required("DELETE")?;
        let previous_identifier = self.scope.frame_identifier(previous).clone();

        let target = self.identifier(delete.target);
        let table = table_for(self.scope.binding(delete.target).data_type)?;

        let deleted_binding = self.scope.define_new(if table == names::TABLE_NODE {
            DataType::NodeComposite
        } else {
            DataType::EdgeComposite
        })?;
        let deleted = self.identifier(deleted_binding);

        let mut join = Expression::equals(
            Expression::column(&target, names::COLUMN_ID),
            Expression::column(&deleted, names::COLUMN_ID),
        );
        rewrite_frame_bindings(&self.scope, &mut join);

        // Later parts read the deleted row from this frame instead of the pre-delete one
        let frame = self.scope.push_frame()?;
        {
            let frame = self.scope.frame_mut(frame);
            frame.exported.remove(&target);
            frame.visible.remove(&target);
        }
        self.scope.export(&deleted)?;

        if let Some(alias) = self.scope.binding(delete.target).alias.clone() {
            self.scope.alias(alias, deleted_binding);
        }

        let returning = self.mutation_returning(frame, deleted_binding, table)?;

        debug!(
            "deleting {target} as {deleted} in {}",
            self.scope.frame_identifier(frame)
        );

        let statement = Delete {
            from: TableReference::table(table, Some(&deleted)),
            using: vec![FromClause::new(TableReference::named(&previous_identifier))],
            where_clause: Some(join),
            returning,
        };

        materialize_frame(&mut self.scope, frame)?;
        self.emit_frame(frame, Query::new(SetExpression::Delete(Box::new(statement))));

        Ok(())
    }
}
