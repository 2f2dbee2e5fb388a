//! Pass 1: scopes, bindings and reference occurrences
//!
//! Two walks over the tree. The first creates a scope for every contract and function and
//! a binding for every declaration, so that forward references resolve. The second
//! resolves every identifier and appends an occurrence to its binding.

use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use crate::annotations::Annotations;
use crate::ast::{Edge, FunctionKind, Node, NodeId, NodeKind, SPECIAL_IDENTIFIERS};
use crate::binding::{Binding, DeclarationKind, Occurrence, OccurrenceRole, WriteShape};
use crate::error::{CompilerError, Result};
use crate::mapping_key::{key_name, MappingKey};
use crate::passes::shape::analyse_write;
use crate::scope::{ParameterInfo, ScopeId, ScopeTree};
use crate::traverse::{traverse, Control, NodePath, Visitor};

pub fn run(ast: &Node, annotations: &mut Annotations) -> Result<ScopeTree> {
    let mut tree = ScopeTree::new();
    traverse(ast, &mut DeclarationCollector { tree: &mut tree, stack: Vec::new() })?;
    traverse(
        ast,
        &mut ReferenceCollector {
            tree: &mut tree,
            annotations,
            stack: Vec::new(),
            writes: HashMap::new(),
            self_operands: HashSet::new(),
        },
    )?;
    debug!(scopes = tree.len(), "built scope tree");
    Ok(tree)
}

/// `constructor` for constructors, `name_<n>` for the n-th overload of `name`
fn unique_function_name(path: &NodePath<'_>, name: &str, kind: FunctionKind) -> String {
    if kind == FunctionKind::Constructor {
        return "constructor".to_string();
    }
    let (Some(parent), Edge::Nodes(index)) = (path.parent_node(), path.edge) else {
        return name.to_string();
    };
    let NodeKind::ContractDefinition { nodes, .. } = &parent.kind else {
        return name.to_string();
    };
    let earlier = nodes[..index]
        .iter()
        .filter(|n| {
            matches!(&n.kind, NodeKind::FunctionDefinition { name: other, kind: FunctionKind::Function, .. } if other == name)
        })
        .count();
    if earlier == 0 {
        name.to_string()
    } else {
        format!("{}_{}", name, earlier)
    }
}

fn parameter_infos(parameters: &Node) -> Vec<ParameterInfo> {
    let NodeKind::ParameterList { parameters } = &parameters.kind else {
        return Vec::new();
    };
    parameters
        .iter()
        .filter_map(|p| match &p.kind {
            NodeKind::VariableDeclaration { name, is_secret, .. } => {
                Some(ParameterInfo { name: name.clone(), binding: p.id, is_secret: *is_secret })
            }
            _ => None,
        })
        .collect()
}

struct DeclarationCollector<'t> {
    tree: &'t mut ScopeTree,
    stack: Vec<ScopeId>,
}

impl DeclarationCollector<'_> {
    fn current(&self, node: &Node) -> Result<ScopeId> {
        self.stack.last().copied().ok_or_else(|| {
            CompilerError::unsupported(format!("{} outside a contract", node.kind_name()), Some(node.src))
        })
    }
}

impl Visitor for DeclarationCollector<'_> {
    fn enter(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        let node = path.node;
        match &node.kind {
            NodeKind::ContractDefinition { name, .. } => {
                let id = self.tree.add_contract(node.id, node.src, name);
                trace!(contract = %name, scope = id.0, "contract scope");
                self.stack.push(id);
            }
            NodeKind::FunctionDefinition { name, kind, parameters, .. } => {
                let contract = self.current(node)?;
                let unique = unique_function_name(path, name, *kind);
                let scope = self.tree.add_function(contract, node.id, node.src, &unique, *kind);
                self.tree.get_mut(scope).parameters = parameter_infos(parameters);

                let mut binding =
                    Binding::new(node.id, &unique, DeclarationKind::FunctionDefinition, node.src, contract);
                binding.function_scope = Some(scope);
                self.tree.declare(contract, binding);
                trace!(function = %unique, scope = scope.0, "function scope");
                self.stack.push(scope);
            }
            NodeKind::VariableDeclaration { name, type_name, state_variable, is_secret, constant } => {
                let scope = self.current(node)?;
                let kind = if *state_variable {
                    DeclarationKind::StateVariable
                } else {
                    match path.declaration_list() {
                        Some(Edge::Parameters) => DeclarationKind::Parameter,
                        Some(_) => DeclarationKind::ReturnParameter,
                        None => DeclarationKind::LocalVariable,
                    }
                };
                let binding = Binding::new(node.id, name, kind, node.src, scope)
                    .secret(*is_secret)
                    .mapping(type_name.is_mapping())
                    .constant(*constant);
                trace!(name = %name, ?kind, secret = *is_secret, "declared");
                self.tree.declare(scope, binding);
            }
            _ => {}
        }
        Ok(())
    }

    fn exit(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        if matches!(
            path.node.kind,
            NodeKind::ContractDefinition { .. } | NodeKind::FunctionDefinition { .. }
        ) {
            self.stack.pop();
        }
        Ok(())
    }
}

struct ReferenceCollector<'t> {
    tree: &'t mut ScopeTree,
    annotations: &'t mut Annotations,
    stack: Vec<ScopeId>,
    /// Identifier nodes written by an enclosing assignment or update
    writes: HashMap<NodeId, WriteShape>,
    self_operands: HashSet<NodeId>,
}

impl ReferenceCollector<'_> {
    fn resolve_id(
        &self,
        scope: ScopeId,
        name: &str,
        referenced: Option<NodeId>,
    ) -> Option<NodeId> {
        referenced
            .filter(|id| self.tree.binding(*id).is_some())
            .or_else(|| self.tree.lookup(scope, name))
    }

    fn mapping_key(&self, scope: ScopeId, index: &Node) -> Result<MappingKey> {
        if index.is_msg_sender() {
            return Ok(MappingKey::msg_sender());
        }
        let mut key = MappingKey::new(key_name(index)?);
        if let NodeKind::Identifier { name, referenced_declaration } = &index.kind {
            key.key_binding = self.resolve_id(scope, name, *referenced_declaration);
            key.is_param = key
                .key_binding
                .and_then(|id| self.tree.binding(id))
                .is_some_and(|b| b.kind == DeclarationKind::Parameter);
        }
        Ok(key)
    }

    fn reference(
        &mut self,
        path: &NodePath<'_>,
        name: &str,
        referenced: Option<NodeId>,
    ) -> Result<()> {
        let node = path.node;
        if SPECIAL_IDENTIFIERS.contains(&name) {
            return Ok(());
        }
        let scope = *self
            .stack
            .last()
            .ok_or_else(|| CompilerError::unresolved(name, node.src))?;
        let id = self
            .resolve_id(scope, name, referenced)
            .ok_or_else(|| CompilerError::unresolved(name, node.src))?;
        self.tree.record_resolution(node.id, id);

        let role = match self.writes.get(&node.id) {
            Some(shape) => OccurrenceRole::Write(*shape),
            None if self.self_operands.contains(&node.id) => OccurrenceRole::SelfOperand,
            None => OccurrenceRole::Read,
        };

        let is_mapping = self.tree.binding(id).is_some_and(|b| b.is_mapping);
        let key = match (is_mapping && path.is_index_base(), path.parent_node().map(|p| &p.kind)) {
            (true, Some(NodeKind::IndexAccess { index_expression, .. })) => {
                Some(self.mapping_key(scope, index_expression)?)
            }
            _ => None,
        };

        let occurrence = Occurrence {
            node: node.id,
            src: node.src,
            scope,
            statement: path.enclosing_statement().map(|s| s.id),
            role,
            key: key.as_ref().map(|k| k.name.clone()),
        };
        trace!(name, node = node.id.0, ?role, "occurrence");
        if let Some(binding) = self.tree.binding_mut(id) {
            binding.record(occurrence, key);
        }
        Ok(())
    }
}

impl Visitor for ReferenceCollector<'_> {
    fn enter(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        let node = path.node;
        match &node.kind {
            NodeKind::ContractDefinition { .. } | NodeKind::FunctionDefinition { .. } => {
                let scope = self.tree.scope_of_node(node.id).ok_or_else(|| {
                    CompilerError::internal(format!("no scope for {} {}", node.kind_name(), node.id))
                })?;
                self.stack.push(scope);
            }
            NodeKind::Assignment { .. } | NodeKind::UnaryOperation { .. } => {
                if let Some(site) = analyse_write(node)? {
                    self.writes.insert(site.target.id, site.shape);
                    if let Some(operand) = site.self_operand {
                        self.self_operands.insert(operand.id);
                    }
                    self.annotations.write_shapes.insert(node.id, site.shape);
                }
            }
            NodeKind::Identifier { name, referenced_declaration } => {
                self.reference(path, name, *referenced_declaration)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn exit(&mut self, path: &NodePath<'_>, _control: &mut Control) -> Result<()> {
        if matches!(
            path.node.kind,
            NodeKind::ContractDefinition { .. } | NodeKind::FunctionDefinition { .. }
        ) {
            self.stack.pop();
        }
        Ok(())
    }
}
