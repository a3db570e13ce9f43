use std::collections::BTreeSet;

use dc_core::NodeHandle;

/// Read access to the host scene graph, used to resolve node arguments and
/// command targets.
pub trait SceneLookup {
    /// Resolves a node by full path (`/root/player`) or by its name.
    fn find_node(&self, path: &str) -> Option<NodeHandle>;
    fn has_component(&self, node: NodeHandle, component: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScene;

impl SceneLookup for EmptyScene {
    fn find_node(&self, _path: &str) -> Option<NodeHandle> {
        None
    }

    fn has_component(&self, _node: NodeHandle, _component: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    path: String,
    components: BTreeSet<String>,
}

impl SceneNode {
    fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(self.path.as_str())
    }
}

/// In-memory scene: a flat list of nodes keyed by absolute path.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<I, S>(&mut self, path: &str, components: I) -> NodeHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = normalize_path(path);
        let components = components.into_iter().map(Into::into).collect();
        if let Some(index) = self.nodes.iter().position(|node| node.path == path) {
            self.nodes[index].components = components;
            return NodeHandle(index as u64);
        }
        self.nodes.push(SceneNode { path, components });
        NodeHandle((self.nodes.len() - 1) as u64)
    }

    pub fn node_path(&self, node: NodeHandle) -> Option<&str> {
        self.nodes
            .get(node.0 as usize)
            .map(|entry| entry.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SceneLookup for SceneGraph {
    fn find_node(&self, path: &str) -> Option<NodeHandle> {
        if path.is_empty() {
            return None;
        }
        if path.starts_with('/') {
            let normalized = normalize_path(path);
            return self
                .nodes
                .iter()
                .position(|node| node.path == normalized)
                .map(|index| NodeHandle(index as u64));
        }
        self.nodes
            .iter()
            .position(|node| node.name() == path)
            .map(|index| NodeHandle(index as u64))
    }

    fn has_component(&self, node: NodeHandle, component: &str) -> bool {
        self.nodes
            .get(node.0 as usize)
            .map(|entry| entry.components.contains(component))
            .unwrap_or(false)
    }
}

fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}
