use crate::{ArenaTree, NodeId, TreeError, TreePath};

/// Read side of a tree that a view can walk.
pub trait TreeModel {
    type Node: Copy + Eq;

    fn root(&self) -> Option<Self::Node>;

    fn is_leaf(&self, node: Self::Node) -> bool;

    fn child_at(&self, parent: Self::Node, index: usize) -> Result<Self::Node, TreeError>;

    fn child_count(&self, parent: Self::Node) -> usize;

    fn index_of_child(&self, parent: Self::Node, child: Self::Node) -> Option<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChangeKind {
    /// Anything below `path` may have changed; views should re-read it.
    StructureChanged,
    NodesChanged,
    NodesInserted,
    NodesRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeModelEvent {
    pub kind: TreeChangeKind,
    /// Path to the parent of the affected children.
    pub path: TreePath<NodeId>,
    pub child_indices: Vec<usize>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

pub type TreeObserver = Box<dyn FnMut(&TreeModelEvent) + Send + Sync>;

/// Callbacks interested in tree changes.
#[derive(Default)]
pub struct TreeObservers {
    observers: Vec<(ObserverId, TreeObserver)>,
    next_id: u32,
}

impl TreeObservers {
    pub fn subscribe(&mut self, observer: TreeObserver) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        before != self.observers.len()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn fire(&mut self, event: &TreeModelEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    pub fn fire_structure_changed(&mut self, path: TreePath<NodeId>) {
        self.fire(&TreeModelEvent {
            kind: TreeChangeKind::StructureChanged,
            path,
            child_indices: Vec::new(),
            children: Vec::new(),
        });
    }

    pub fn fire_nodes_changed(
        &mut self,
        path: TreePath<NodeId>,
        indices: Vec<usize>,
        children: Vec<NodeId>,
    ) {
        self.fire_children(TreeChangeKind::NodesChanged, path, indices, children);
    }

    pub fn fire_nodes_inserted(
        &mut self,
        path: TreePath<NodeId>,
        indices: Vec<usize>,
        children: Vec<NodeId>,
    ) {
        self.fire_children(TreeChangeKind::NodesInserted, path, indices, children);
    }

    pub fn fire_nodes_removed(
        &mut self,
        path: TreePath<NodeId>,
        indices: Vec<usize>,
        children: Vec<NodeId>,
    ) {
        self.fire_children(TreeChangeKind::NodesRemoved, path, indices, children);
    }

    fn fire_children(
        &mut self,
        kind: TreeChangeKind,
        path: TreePath<NodeId>,
        child_indices: Vec<usize>,
        children: Vec<NodeId>,
    ) {
        if self.observers.is_empty() {
            return;
        }
        self.fire(&TreeModelEvent {
            kind,
            path,
            child_indices,
            children,
        });
    }
}

/// An [`ArenaTree`] that tells its observers about every edit made through
/// it.
pub struct ArenaTreeModel<T> {
    tree: ArenaTree<T>,
    observers: TreeObservers,
}

impl<T> Default for ArenaTreeModel<T> {
    fn default() -> Self {
        Self {
            tree: ArenaTree::new(),
            observers: TreeObservers::default(),
        }
    }
}

impl<T> ArenaTreeModel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &ArenaTree<T> {
        &self.tree
    }

    /// Direct access for bulk edits. Call [`Self::fire_structure_changed`]
    /// afterwards.
    pub fn tree_mut(&mut self) -> &mut ArenaTree<T> {
        &mut self.tree
    }

    pub fn observers_mut(&mut self) -> &mut TreeObservers {
        &mut self.observers
    }

    pub fn subscribe(&mut self, observer: TreeObserver) -> ObserverId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.tree.get(id)
    }

    pub fn set_root(&mut self, data: T) -> NodeId {
        let root = self.tree.set_root(data);
        self.observers.fire_structure_changed(TreePath::empty());
        root
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        data: T,
    ) -> Result<NodeId, TreeError> {
        let child = self.tree.insert_child(parent, index, data)?;
        let path = self.tree.path_to(parent)?;
        self.observers.fire_nodes_inserted(path, vec![index], vec![child]);
        Ok(child)
    }

    pub fn append_child(&mut self, parent: NodeId, data: T) -> Result<NodeId, TreeError> {
        let index = self.tree.child_count(parent);
        self.insert_child(parent, index, data)
    }

    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let child = self.tree.remove_child(parent, index)?;
        let path = self.tree.path_to(parent)?;
        self.observers.fire_nodes_removed(path, vec![index], vec![child]);
        Ok(child)
    }

    /// Edits one node in place and reports it as changed.
    pub fn update(&mut self, id: NodeId, edit: impl FnOnce(&mut T)) -> Result<(), TreeError> {
        let data = self.tree.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        edit(data);

        match self.tree.parent(id) {
            Some(parent) => {
                let index = self.tree.index_of_child(parent, id).unwrap_or_default();
                let path = self.tree.path_to(parent)?;
                self.observers.fire_nodes_changed(path, vec![index], vec![id]);
            }
            None => self
                .observers
                .fire_nodes_changed(TreePath::empty(), Vec::new(), vec![id]),
        }
        Ok(())
    }

    pub fn fire_structure_changed(&mut self, node: NodeId) -> Result<(), TreeError> {
        let path = self.tree.path_to(node)?;
        self.observers.fire_structure_changed(path);
        Ok(())
    }
}

impl<T> TreeModel for ArenaTreeModel<T> {
    type Node = NodeId;

    fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.tree.is_leaf(node)
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        self.tree.child_at(parent, index)
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.tree.child_count(parent)
    }

    fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.tree.index_of_child(parent, child)
    }
}
