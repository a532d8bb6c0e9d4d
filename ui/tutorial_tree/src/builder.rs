use {
    crate::{DependencyNode, DependencyTree, DependencyTreeError, tree::SourceBinding},
    bevy::log::{debug, warn},
    tree_model::{NodeId, TreeError},
    tutorial::{HubError, TutorialHub},
    tutorial_components::{AggregatorId, DiagnosticPolicy, EventMessage, EventMessageState, MatchResult},
};

/// A dependency edge that was dropped because it would close a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedDependency {
    pub parent: AggregatorId,
    pub child: AggregatorId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub rejected: Vec<RejectedDependency>,
    /// Tracked ids the hub does not know.
    pub skipped: Vec<AggregatorId>,
}

/// Builds a [`DependencyTree`] from the current state of a hub.
#[derive(Debug, Clone, Default)]
pub struct DependencyTreeBuilder {
    tracked: Vec<AggregatorId>,
    policy: DiagnosticPolicy,
}

/// Snapshot of one tracked aggregator taken before the tree is laid out.
struct ExpectedStates {
    source: AggregatorId,
    success: Option<EventMessage>,
    required: Vec<EventMessageState>,
    dependencies: Vec<usize>,
    is_dependency: bool,
}

impl ExpectedStates {
    fn expects(&self, message: &EventMessage) -> bool {
        self.required.iter().any(|state| state.message == *message)
    }
}

struct PendingNode {
    data: DependencyNode,
    source: Option<AggregatorId>,
    children: Vec<PendingNode>,
}

impl DependencyTreeBuilder {
    pub fn new(tracked: impl IntoIterator<Item = AggregatorId>) -> Self {
        Self {
            tracked: tracked.into_iter().collect(),
            policy: DiagnosticPolicy::Degrade,
        }
    }

    pub fn with_policy(mut self, policy: DiagnosticPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(
        &self,
        hub: &TutorialHub,
    ) -> Result<(DependencyTree, BuildReport), DependencyTreeError> {
        let mut report = BuildReport::default();
        let mut states = self.collect(hub, &mut report)?;

        for parent in 0..states.len() {
            for child in 0..states.len() {
                if parent == child {
                    continue;
                }
                let provides = match &states[child].success {
                    Some(success) => states[parent].expects(success),
                    None => false,
                };
                if provides {
                    add_dependency(&mut states, parent, child, &mut report);
                }
            }
        }

        let tracked = states.iter().map(|s| s.source).collect();
        let mut tree = DependencyTree::new(tracked, self.policy);
        let root = tree.model.tree_mut().set_root(DependencyNode::root());

        for index in (0..states.len()).filter(|&i| !states[i].is_dependency) {
            let mut pending = expand(&states, index, hub);
            pending.data.expected_next = false;
            attach_to_root(&mut tree, root, pending)?;
        }

        debug!(
            tracked = tree.tracked.len(),
            rejected = report.rejected.len(),
            "built tutorial dependency tree"
        );
        tree.refresh_all(hub)?;
        Ok((tree, report))
    }

    fn collect(
        &self,
        hub: &TutorialHub,
        report: &mut BuildReport,
    ) -> Result<Vec<ExpectedStates>, DependencyTreeError> {
        let mut states = Vec::with_capacity(self.tracked.len());
        let mut buffer = Vec::new();
        for &source in &self.tracked {
            let Some(slot) = hub.aggregator(source) else {
                if self.policy.is_fail_fast() {
                    return Err(HubError::UnknownAggregator(source).into());
                }
                warn!(%source, "tracked aggregator does not exist, skipping");
                report.skipped.push(source);
                continue;
            };
            if states.iter().any(|s: &ExpectedStates| s.source == source) {
                continue;
            }
            states.push(ExpectedStates {
                source,
                success: slot.success_message().cloned(),
                required: slot.list_events(&mut buffer).to_vec(),
                dependencies: Vec::new(),
                is_dependency: false,
            });
        }
        Ok(states)
    }
}

fn depends_on(states: &[ExpectedStates], node: usize, target: usize) -> bool {
    states[node]
        .dependencies
        .iter()
        .any(|&dep| dep == target || depends_on(states, dep, target))
}

fn add_dependency(
    states: &mut [ExpectedStates],
    parent: usize,
    child: usize,
    report: &mut BuildReport,
) {
    if depends_on(states, child, parent) {
        warn!(
            parent = %states[parent].source,
            child = %states[child].source,
            "circular dependency between tutorial steps, dropping edge"
        );
        report.rejected.push(RejectedDependency {
            parent: states[parent].source,
            child: states[child].source,
        });
        return;
    }
    states[child].is_dependency = true;
    if !states[parent].dependencies.contains(&child) {
        states[parent].dependencies.push(child);
    }
}

/// Lays out the subtree of `index`, nesting dependencies in place of the
/// messages they provide.
fn expand(states: &[ExpectedStates], index: usize, hub: &TutorialHub) -> PendingNode {
    let state = &states[index];
    let children = state
        .required
        .iter()
        .map(|required| {
            let provider = state
                .dependencies
                .iter()
                .copied()
                .find(|&dep| states[dep].success.as_ref() == Some(&required.message));
            match provider {
                Some(dep) => {
                    let mut node = expand(states, dep, hub);
                    node.data.expected_next = required.expected_next;
                    node
                }
                None => PendingNode {
                    data: DependencyNode::leaf(required),
                    source: None,
                    children: Vec::new(),
                },
            }
        })
        .collect();

    let completed = hub
        .match_result(state.source)
        .is_ok_and(|result| result == MatchResult::Success);
    PendingNode {
        data: DependencyNode {
            message: state.success.clone(),
            completed,
            expected_next: false,
        },
        source: Some(state.source),
        children,
    }
}

/// Places a top-level subtree under the root. An aggregator without a success
/// message has no row of its own; its children go straight under the root.
fn attach_to_root(
    tree: &mut DependencyTree,
    root: NodeId,
    pending: PendingNode,
) -> Result<Vec<NodeId>, TreeError> {
    if pending.data.message.is_some() {
        let mut pending = pending;
        pending.data.expected_next = false;
        return Ok(vec![insert(tree, root, pending)?]);
    }

    let mut placed = Vec::new();
    for mut child in pending.children {
        child.data.expected_next = false;
        placed.extend(attach_to_root(tree, root, child)?);
    }
    if let Some(source) = pending.source {
        tree.bindings.entry(source).or_default().push(SourceBinding {
            node: None,
            children: placed.clone(),
        });
    }
    Ok(placed)
}

fn insert(tree: &mut DependencyTree, parent: NodeId, pending: PendingNode) -> Result<NodeId, TreeError> {
    let id = tree.model.tree_mut().append_child(parent, pending.data)?;
    let mut children = Vec::with_capacity(pending.children.len());
    for child in pending.children {
        children.push(insert(tree, id, child)?);
    }
    if let Some(source) = pending.source {
        tree.bindings.entry(source).or_default().push(SourceBinding {
            node: Some(id),
            children,
        });
    }
    Ok(id)
}
