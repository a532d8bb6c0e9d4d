use {
    crate::TreeError,
    std::{fmt, slice},
};

/// The nodes from the root down to some node, inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath<N> {
    nodes: Vec<N>,
}

impl<N> Default for TreePath<N> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<N: Clone> TreePath<N> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = N>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
        }
    }

    /// A new path one level deeper.
    pub fn append(&self, node: N) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Self { nodes }
    }

    pub fn parent(&self) -> Result<Self, TreeError> {
        match self.nodes.split_last() {
            Some((_, rest)) => Ok(Self {
                nodes: rest.to_vec(),
            }),
            None => Err(TreeError::EmptyPath),
        }
    }

    pub fn last(&self) -> Option<&N> {
        self.nodes.last()
    }

    pub fn get(&self, index: usize) -> Option<&N> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, N> {
        self.nodes.iter()
    }
}

impl<N: fmt::Display> fmt::Display for TreePath<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, node) in self.nodes.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_parent() {
        let root = TreePath::empty().append("root");
        let leaf = root.append("child").append("leaf");

        assert_eq!(leaf.len(), 3);
        assert_eq!(leaf.last(), Some(&"leaf"));
        assert_eq!(leaf.parent().unwrap().parent().unwrap(), root);
        assert_eq!(leaf.to_string(), "[root, child, leaf]");
        assert_eq!(
            TreePath::<&str>::empty().parent(),
            Err(TreeError::EmptyPath)
        );
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(TreePath::from_nodes([1, 2]), TreePath::empty().append(1).append(2));
        assert_ne!(TreePath::from_nodes([1, 2]), TreePath::from_nodes([2, 1]));
    }
}
