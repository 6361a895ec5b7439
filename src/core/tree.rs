//! Snapshots of the active configuration of a machine hierarchy.

use super::container::StateContainer;
use super::state::State;
use std::fmt;

/// The current state of a machine and, recursively, of its running sub-machines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateTreeNode {
    pub state: State,
    pub children: Vec<StateTreeNode>,
}

impl StateTreeNode {
    pub fn new(state: State, children: Vec<StateTreeNode>) -> Self {
        Self { state, children }
    }

    /// Depth-first list of every state in the tree.
    pub fn states(&self) -> Vec<&State> {
        let mut out = vec![&self.state];
        for child in &self.children {
            out.extend(child.states());
        }
        out
    }

    /// Leaf states of the tree, left to right.
    pub fn leaves(&self) -> Vec<&State> {
        if self.children.is_empty() {
            return vec![&self.state];
        }
        self.children.iter().flat_map(StateTreeNode::leaves).collect()
    }
}

impl fmt::Display for StateTreeNode {
    /// Renders as `Parent[ChildA[Leaf], ChildB]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if self.children.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str("]")
    }
}

/// Like [`StateTreeNode`], holding containers instead of bare states.
#[derive(Clone, Debug)]
pub struct StateContainerTreeNode {
    pub container: StateContainer,
    pub children: Vec<StateContainerTreeNode>,
}

impl StateContainerTreeNode {
    pub fn new(container: StateContainer, children: Vec<StateContainerTreeNode>) -> Self {
        Self {
            container,
            children,
        }
    }

    /// Drop the containers, keeping only their states.
    pub fn to_state_tree(&self) -> StateTreeNode {
        StateTreeNode::new(
            self.container.state().clone(),
            self.children
                .iter()
                .map(StateContainerTreeNode::to_state_tree)
                .collect(),
        )
    }
}
