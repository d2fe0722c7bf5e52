//! Symbol tracking for a single translation.
//!
//! Every identifier the translator emits is allocated here. The scope owns:
//!
//! 1. An arena of [`BoundIdentifier`]s indexed by [`BindingId`]. Dependencies between
//!    bindings (a path depending on its edges, an expansion edge on its expansion) are
//!    stored as ids so a [`Scope::snapshot`] is a plain clone.
//! 2. An arena of [`Frame`]s and a stack of the frames currently in effect. A frame is
//!    one step of the CTE chain; its binding (`s0`, `s1`, ...) names the CTE.
//! 3. The alias table mapping cypher variable names to compiler identifiers.
//!
//! Frame visibility rules:
//! - a pushed frame starts with the parent's exported set as both its visible and
//!   exported sets
//! - `export` adds to both sets, `declare` only to the visible set
//! - unwinding is only allowed to a frame on the current stack

use std::collections::HashMap;

use log::trace;

use crate::pgsql::{DataType, Identifier, IdentifierSet, Parameter};

use super::errors::{TranslationError, TranslationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(usize);

#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    /// Scope binding naming this frame's CTE
    pub binding: BindingId,
    pub previous: Option<FrameId>,
    pub visible: IdentifierSet,
    pub exported: IdentifierSet,
}

impl Frame {
    /// Everything referenceable from within this frame
    pub fn known(&self) -> IdentifierSet {
        self.visible.union(&self.exported)
    }

    pub fn export(&mut self, identifier: &Identifier) {
        self.visible.add(identifier.clone());
        self.exported.add(identifier.clone());
    }

    pub fn declare(&mut self, identifier: &Identifier) {
        self.visible.add(identifier.clone());
    }
}

/// A compiler identifier bound to a semantic type
#[derive(Debug, Clone)]
pub struct BoundIdentifier {
    pub identifier: Identifier,
    pub alias: Option<Identifier>,
    pub parameter: Option<Parameter>,
    pub data_type: DataType,
    pub dependencies: Vec<BindingId>,
    /// Frame whose CTE most recently projected this binding
    pub last_projection: Option<FrameId>,
}

impl BoundIdentifier {
    /// The cypher-facing name when aliased, otherwise the compiler identifier
    pub fn aliased(&self) -> &Identifier {
        self.alias.as_ref().unwrap_or(&self.identifier)
    }
}

/// Per-prefix counters for identifier allocation
#[derive(Debug, Clone, Default)]
pub struct IdentifierGenerator {
    counters: HashMap<&'static str, usize>,
}

impl IdentifierGenerator {
    fn prefix(data_type: DataType) -> Option<&'static str> {
        match data_type {
            DataType::ExpansionPattern => Some("ex"),
            DataType::ExpansionPath => Some("ep"),
            DataType::PathComposite => Some("p"),
            DataType::NodeComposite
            | DataType::ExpansionRootNode
            | DataType::ExpansionTerminalNode => Some("n"),
            DataType::EdgeComposite | DataType::ExpansionEdge | DataType::PathEdge => Some("e"),
            DataType::Scope => Some("s"),
            DataType::Parameter => Some("pi"),
            _ => None,
        }
    }

    pub fn new_identifier(&mut self, data_type: DataType) -> TranslationResult<Identifier> {
        let prefix = Self::prefix(data_type).ok_or_else(|| {
            TranslationError::malformed(format!(
                "identifier with data type {data_type} does not have a prefix case"
            ))
        })?;

        Ok(self.next(prefix))
    }

    /// Identifier for a computed projection item (`i0`, `i1`, ...)
    pub fn new_projection_identifier(&mut self) -> Identifier {
        self.next("i")
    }

    fn next(&mut self, prefix: &'static str) -> Identifier {
        let counter = self.counters.entry(prefix).or_insert(0);
        let identifier = Identifier::new(format!("{prefix}{counter}"));
        *counter += 1;

        identifier
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    frames: Vec<Frame>,
    stack: Vec<FrameId>,
    bindings: Vec<BoundIdentifier>,
    definitions: HashMap<Identifier, BindingId>,
    aliases: HashMap<Identifier, Identifier>,
    generator: IdentifierGenerator,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy of the scope. Frame and binding ids remain valid in the copy.
    pub fn snapshot(&self) -> Scope {
        self.clone()
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    pub fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0]
    }

    pub fn current_frame_id(&self) -> Option<FrameId> {
        self.stack.last().copied()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame_id().map(|id| self.frame(id))
    }

    fn require_current_frame(&self) -> TranslationResult<FrameId> {
        self.current_frame_id()
            .ok_or_else(|| TranslationError::malformed("no scope frame is active"))
    }

    /// Identifier of the CTE the given frame is compiled into
    pub fn frame_identifier(&self, id: FrameId) -> &Identifier {
        &self.binding(self.frame(id).binding).identifier
    }

    pub fn push_frame(&mut self) -> TranslationResult<FrameId> {
        let binding = self.define_new(DataType::Scope)?;
        let id = FrameId(self.frames.len());
        let previous = self.current_frame_id();

        let inherited = previous
            .map(|previous| self.frame(previous).exported.clone())
            .unwrap_or_default();

        self.frames.push(Frame {
            id,
            binding,
            previous,
            visible: inherited.clone(),
            exported: inherited,
        });
        self.stack.push(id);

        trace!("pushed frame {}", self.frame_identifier(id));
        Ok(id)
    }

    pub fn pop_frame(&mut self) -> TranslationResult<FrameId> {
        self.stack
            .pop()
            .ok_or_else(|| TranslationError::malformed("unable to pop frame: frame stack is empty"))
    }

    /// Pops frames until `target` is the current frame
    pub fn unwind_to_frame(&mut self, target: FrameId) -> TranslationResult<()> {
        if !self.stack.contains(&target) {
            return Err(TranslationError::malformed(format!(
                "unable to unwind to frame {}: frame is not an ancestor of the current frame",
                self.frame_identifier(target)
            )));
        }

        while self.current_frame_id() != Some(target) {
            self.pop_frame()?;
        }

        Ok(())
    }

    pub fn declare(&mut self, identifier: &Identifier) -> TranslationResult<()> {
        let current = self.require_current_frame()?;
        self.frame_mut(current).declare(identifier);
        Ok(())
    }

    pub fn export(&mut self, identifier: &Identifier) -> TranslationResult<()> {
        let current = self.require_current_frame()?;
        self.frame_mut(current).export(identifier);
        Ok(())
    }

    /// Known identifiers of the current frame; empty when no frame is active
    pub fn known(&self) -> IdentifierSet {
        self.current_frame().map(Frame::known).unwrap_or_default()
    }

    pub fn define(&mut self, identifier: Identifier, data_type: DataType) -> BindingId {
        let id = BindingId(self.bindings.len());

        self.bindings.push(BoundIdentifier {
            identifier: identifier.clone(),
            alias: None,
            parameter: None,
            data_type,
            dependencies: vec![],
            last_projection: None,
        });
        self.definitions.insert(identifier, id);

        id
    }

    pub fn define_new(&mut self, data_type: DataType) -> TranslationResult<BindingId> {
        let identifier = self.generator.new_identifier(data_type)?;
        Ok(self.define(identifier, data_type))
    }

    /// Binds a computed projection item. Unlike [`Scope::define_new`] any value type is
    /// accepted.
    pub fn define_projection(&mut self, data_type: DataType) -> BindingId {
        let identifier = self.generator.new_projection_identifier();
        self.define(identifier, data_type)
    }

    pub fn alias(&mut self, alias: Identifier, binding: BindingId) {
        let target = self.bindings[binding.0].identifier.clone();

        self.bindings[binding.0].alias = Some(alias.clone());
        self.aliases.insert(alias, target);
    }

    pub fn binding(&self, id: BindingId) -> &BoundIdentifier {
        &self.bindings[id.0]
    }

    pub fn binding_mut(&mut self, id: BindingId) -> &mut BoundIdentifier {
        &mut self.bindings[id.0]
    }

    pub fn identifier(&self, id: BindingId) -> &Identifier {
        &self.bindings[id.0].identifier
    }

    pub fn lookup(&self, identifier: &Identifier) -> Option<BindingId> {
        self.definitions.get(identifier).copied()
    }

    pub fn aliased_lookup(&self, alias: &Identifier) -> Option<BindingId> {
        self.aliases
            .get(alias)
            .and_then(|identifier| self.lookup(identifier))
    }

    pub fn lookup_string(&self, alias: &str) -> Option<BindingId> {
        self.aliased_lookup(&Identifier::from(alias))
    }

    /// Resolves every identifier, ordered by definition
    pub fn lookup_bindings<'a, I>(&self, identifiers: I) -> TranslationResult<Vec<BindingId>>
    where
        I: IntoIterator<Item = &'a Identifier>,
    {
        let mut bindings = identifiers
            .into_iter()
            .map(|identifier| {
                self.lookup(identifier).ok_or_else(|| {
                    TranslationError::unresolved(format!("missing bound identifier: {identifier}"))
                })
            })
            .collect::<TranslationResult<Vec<_>>>()?;

        bindings.sort();
        Ok(bindings)
    }

    /// Drops every definition that is not in `keep`. Frame and parameter bindings survive.
    pub fn prune_definitions(&mut self, keep: &IdentifierSet) {
        let bindings = &self.bindings;

        self.definitions.retain(|identifier, binding| {
            keep.contains(identifier)
                || matches!(
                    bindings[binding.0].data_type,
                    DataType::Scope | DataType::Parameter
                )
        });

        let definitions = &self.definitions;
        self.aliases
            .retain(|_, identifier| definitions.contains_key(identifier));
    }

    /// Forgets every cypher alias not named in `keep`
    pub fn prune_aliases(&mut self, keep: &IdentifierSet) {
        self.aliases.retain(|alias, _| keep.contains(alias));
    }

    pub fn materialized_by(&mut self, binding: BindingId, frame: FrameId) {
        self.bindings[binding.0].last_projection = Some(frame);
    }

    pub fn depend_on(&mut self, binding: BindingId, dependency: BindingId) {
        self.bindings[binding.0].dependencies.push(dependency);
    }

    /// Mutual dependency
    pub fn link(&mut self, left: BindingId, right: BindingId) {
        self.depend_on(left, right);
        self.depend_on(right, left);
    }

    pub fn first_dependency_by_type(
        &self,
        binding: BindingId,
        data_type: DataType,
    ) -> Option<BindingId> {
        self.bindings[binding.0]
            .dependencies
            .iter()
            .copied()
            .find(|dependency| self.bindings[dependency.0].data_type == data_type)
    }
}
