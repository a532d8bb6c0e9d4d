use {
    crate::{TreeError, TreeModel, TreePath},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    data: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A tree stored in one vector; nodes link to their parent and children by
/// index.
///
/// Removing a child only unlinks it. Its slot stays allocated until the tree
/// is cleared.
#[derive(Debug, Clone)]
pub struct ArenaTree<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
}

impl<T> Default for ArenaTree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<T> ArenaTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node and starts over with a single root.
    pub fn set_root(&mut self, data: T) -> NodeId {
        self.nodes.clear();
        let id = self.alloc(data, None);
        self.root = Some(id);
        id
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Allocated slots, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).map(|n| &n.data)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id.0).map(|n| &mut n.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn alloc(&mut self, data: T, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<T>, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::UnknownNode(id))
    }

    pub fn append_child(&mut self, parent: NodeId, data: T) -> Result<NodeId, TreeError> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, data)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        data: T,
    ) -> Result<NodeId, TreeError> {
        let count = self.node_mut(parent)?.children.len();
        if index > count {
            return Err(TreeError::ChildIndexOutOfRange { index, count });
        }
        let id = self.alloc(data, Some(parent));
        self.node_mut(parent)?.children.insert(index, id);
        Ok(id)
    }

    /// Unlinks the child at `index` together with its subtree.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let node = self.node_mut(parent)?;
        let count = node.children.len();
        if index >= count {
            return Err(TreeError::ChildIndexOutOfRange { index, count });
        }
        let child = node.children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(child)
    }

    /// Path from the root down to `id`.
    pub fn path_to(&self, id: NodeId) -> Result<TreePath<NodeId>, TreeError> {
        if id.0 >= self.nodes.len() {
            return Err(TreeError::UnknownNode(id));
        }
        let mut nodes = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            nodes.push(parent);
            current = parent;
        }
        nodes.reverse();
        Ok(TreePath::from_nodes(nodes))
    }

    /// Every node reachable from the root with its depth, parents first.
    pub fn depth_first(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<_> = self.root.map(|root| (0, root)).into_iter().collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            stack.extend(self.children(id).iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }

    /// Compares the subtree at `a` with the subtree at `b` in `other`.
    pub fn subtree_eq(&self, a: NodeId, other: &ArenaTree<T>, b: NodeId) -> bool
    where
        T: PartialEq,
    {
        match (self.get(a), other.get(b)) {
            (Some(left), Some(right)) if left == right => {
                let (lc, rc) = (self.children(a), other.children(b));
                lc.len() == rc.len()
                    && lc
                        .iter()
                        .zip(rc)
                        .all(|(&l, &r)| self.subtree_eq(l, other, r))
            }
            _ => false,
        }
    }
}

impl<T> TreeModel for ArenaTree<T> {
    type Node = NodeId;

    fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.children(node).is_empty()
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let node = self.nodes.get(parent.0).ok_or(TreeError::UnknownNode(parent))?;
        node.children
            .get(index)
            .copied()
            .ok_or(TreeError::ChildIndexOutOfRange {
                index,
                count: node.children.len(),
            })
    }

    fn child_count(&self, parent: NodeId) -> usize {
        self.children(parent).len()
    }

    fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }
}
