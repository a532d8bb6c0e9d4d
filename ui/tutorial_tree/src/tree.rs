use {
    bevy::log::warn,
    std::{collections::HashMap, fmt::Write as _},
    thiserror::Error,
    tree_model::{
        ArenaTreeModel, NodeId, ObserverId, TreeError, TreeModel, TreeObserver,
    },
    tutorial::{HubError, HubNotification, TutorialHub},
    tutorial_components::{AggregatorId, DiagnosticPolicy, EventMessage, EventMessageState, MatchResult},
};

#[derive(Debug, Error)]
pub enum DependencyTreeError {
    #[error(transparent)]
    Hub(#[from] HubError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("aggregator '{aggregator}' reported {mismatches} entries that do not match its tree nodes")]
    Inconsistent {
        aggregator: String,
        mismatches: usize,
    },
}

/// One row of the progress tree.
///
/// The synthetic root and nothing else has no message.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub message: Option<EventMessage>,
    pub completed: bool,
    pub expected_next: bool,
}

impl DependencyNode {
    pub fn root() -> Self {
        Self {
            message: None,
            completed: false,
            expected_next: true,
        }
    }

    pub fn leaf(state: &EventMessageState) -> Self {
        Self {
            message: Some(state.message.clone()),
            completed: state.completed,
            expected_next: state.expected_next,
        }
    }

    pub fn label(&self) -> String {
        let mut label = match &self.message {
            Some(message) => message.name().to_string(),
            None => "(root)".to_string(),
        };
        if self.message.is_some() {
            label.push_str(if self.completed { " [x]" } else { " [ ]" });
        }
        if self.expected_next && self.message.is_some() {
            label.push_str(" <- next");
        }
        label
    }
}

/// `expected_next` is advisory and does not take part in equality.
impl PartialEq for DependencyNode {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.completed == other.completed
    }
}

impl Eq for DependencyNode {}

/// Where an aggregator's snapshot lands in the tree.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceBinding {
    /// The aggregator's own node; `None` when it was flattened into the root.
    pub node: Option<NodeId>,
    /// One node per snapshot entry, in snapshot order.
    pub children: Vec<NodeId>,
}

/// Tutorial progress as a tree: each tracked aggregator becomes a node whose
/// children are its configured messages, with aggregators that produce one of
/// those messages nested in its place.
pub struct DependencyTree {
    pub(crate) model: ArenaTreeModel<DependencyNode>,
    pub(crate) bindings: HashMap<AggregatorId, Vec<SourceBinding>>,
    pub(crate) tracked: Vec<AggregatorId>,
    pub(crate) policy: DiagnosticPolicy,
    buffer: Vec<EventMessageState>,
}

impl DependencyTree {
    pub(crate) fn new(tracked: Vec<AggregatorId>, policy: DiagnosticPolicy) -> Self {
        Self {
            model: ArenaTreeModel::new(),
            bindings: HashMap::new(),
            tracked,
            policy,
            buffer: Vec::new(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.model.get(id)
    }

    pub fn tracked(&self) -> &[AggregatorId] {
        &self.tracked
    }

    /// Nodes that represent `source`, one per place it appears.
    pub fn nodes_of(&self, source: AggregatorId) -> Vec<NodeId> {
        self.bindings
            .get(&source)
            .map(|bindings| bindings.iter().filter_map(|b| b.node).collect())
            .unwrap_or_default()
    }

    pub fn subscribe(&mut self, observer: TreeObserver) -> ObserverId {
        self.model.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.model.unsubscribe(id)
    }

    /// Moves the observers of `previous` over to this tree and tells them the
    /// whole structure changed.
    pub fn adopt_observers(&mut self, previous: &mut DependencyTree) -> Result<(), TreeError> {
        std::mem::swap(self.model.observers_mut(), previous.model.observers_mut());
        match self.model.root() {
            Some(root) => self.model.fire_structure_changed(root),
            None => Ok(()),
        }
    }

    /// Re-reads the snapshot of `source` and updates its nodes.
    ///
    /// Returns `false` when `source` is not part of the tree.
    pub fn refresh(
        &mut self,
        hub: &TutorialHub,
        source: AggregatorId,
    ) -> Result<bool, DependencyTreeError> {
        let Some(bindings) = self.bindings.get(&source) else {
            return Ok(false);
        };
        hub.list_events(source, &mut self.buffer)?;
        let succeeded = hub.match_result(source)? == MatchResult::Success;
        let root = self.model.root();
        let tree = self.model.tree_mut();

        let mut mismatches = 0;
        for binding in bindings {
            mismatches += binding.children.len().abs_diff(self.buffer.len());
            for (state, &child) in self.buffer.iter().zip(&binding.children) {
                match tree.get_mut(child) {
                    Some(node) if node.message.as_ref() == Some(&state.message) => {
                        node.completed = state.completed;
                        node.expected_next = state.expected_next;
                    }
                    _ => mismatches += 1,
                }
            }

            if let Some(node) = binding.node {
                if tree.parent(node).is_some() && tree.parent(node) == root {
                    if let Some(data) = tree.get_mut(node) {
                        data.completed = succeeded;
                    }
                }
            }
        }

        if let Some(root) = root {
            self.model.fire_structure_changed(root)?;
        }

        if mismatches > 0 {
            let aggregator = hub
                .aggregator(source)
                .map(|slot| slot.name().to_string())
                .unwrap_or_default();
            warn!(%aggregator, mismatches, "inconsistent data model, keeping last known state");
            if self.policy.is_fail_fast() {
                return Err(DependencyTreeError::Inconsistent {
                    aggregator,
                    mismatches,
                });
            }
        }
        Ok(true)
    }

    pub fn refresh_all(&mut self, hub: &TutorialHub) -> Result<(), DependencyTreeError> {
        for source in self.tracked.clone() {
            self.refresh(hub, source)?;
        }
        Ok(())
    }

    /// Refreshes every aggregator named in `notifications`, once each.
    pub fn apply(
        &mut self,
        hub: &TutorialHub,
        notifications: &[HubNotification],
    ) -> Result<(), DependencyTreeError> {
        let mut refreshed = Vec::new();
        for source in notifications.iter().filter_map(HubNotification::aggregator) {
            if !refreshed.contains(&source) {
                refreshed.push(source);
                self.refresh(hub, source)?;
            }
        }
        Ok(())
    }

    /// Structural equality: same messages and completion flags in the same
    /// shape.
    pub fn same_structure(&self, other: &DependencyTree) -> bool {
        match (self.model.root(), other.model.root()) {
            (Some(a), Some(b)) => self.model.tree().subtree_eq(a, other.model.tree(), b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Human readable dump, four spaces per level.
    pub fn as_text_tree(&self) -> String {
        let mut out = String::new();
        for (depth, id) in self.model.tree().depth_first() {
            if let Some(node) = self.model.get(id) {
                out.push_str(&" ".repeat(depth * 4));
                out.push_str(&node.label());
                out.push('\n');
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.model.tree().depth_first().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for DependencyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();
        writeln!(text, "DependencyTree ({} tracked)", self.tracked.len())?;
        text.push_str(&self.as_text_tree());
        f.write_str(&text)
    }
}

impl TreeModel for DependencyTree {
    type Node = NodeId;

    fn root(&self) -> Option<NodeId> {
        self.model.root()
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.model.is_leaf(node)
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        self.model.child_at(parent, index)
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.model.child_count(parent)
    }

    fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.model.index_of_child(parent, child)
    }
}
