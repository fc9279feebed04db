use glam::{Mat4, Vec3, Vec4};
use gnomon_common::NodeId;

use crate::node::{NodeKind, SceneNode};

/// A light captured during propagation, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub position: Vec3,
    pub color: Vec3,
}

/// Fixed-capacity list of active lights, rebuilt by every propagation
/// pass. Lights encountered after capacity is reached are dropped
/// silently; the retained entries are the first ones met in pre-order.
#[derive(Debug, Clone)]
pub struct LightBuffer {
    slots: Vec<LightSource>,
    capacity: usize,
}

impl LightBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Clear the list for a new frame. Keeps the allocation.
    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn push(&mut self, position: Vec3, color: Vec3) {
        if self.slots.len() < self.capacity {
            self.slots.push(LightSource { position, color });
        }
    }

    pub fn lights(&self) -> &[LightSource] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Arena-backed rooted tree of [`SceneNode`]s.
///
/// Nodes are addressed by stable [`NodeId`] indices into the arena and are
/// never removed. Children are stored as index lists on their parent, so
/// the single-owner tree shape is structural rather than a convention.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    root: NodeId,
}

impl SceneGraph {
    /// Create a graph holding only the root. The root carries an identity
    /// transform and no geometry; it is never rendered.
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::new()],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total nodes in the arena, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a zero-initialized node: origin position, zero rotation,
    /// unit scale, `Geometry` kind, no geometry or texture bound. The node
    /// is unparented until [`add_child`](Self::add_child) places it.
    pub fn create_node(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode::new());
        id
    }

    /// Append `child` under `parent`.
    ///
    /// Panics if `child` already has a parent or is the root: reparenting
    /// is out of scope and a second owner would break the tree shape.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        assert_ne!(child, self.root, "the root cannot be adopted");
        assert!(
            self.nodes[child.0].parent.is_none(),
            "node {child:?} already has a parent"
        );
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    /// Nodes reachable from `from`, itself included. Diagnostics only.
    pub fn count_nodes(&self, from: NodeId) -> usize {
        let mut count = 1;
        for &child in &self.nodes[from.0].children {
            count += self.count_nodes(child);
        }
        count
    }

    /// Pre-order depth-first visit of the subtree rooted at `from`.
    pub fn visit(&self, from: NodeId, f: &mut impl FnMut(NodeId, &SceneNode)) {
        f(from, &self.nodes[from.0]);
        let child_count = self.nodes[from.0].children.len();
        for i in 0..child_count {
            self.visit(self.nodes[from.0].children[i], f);
        }
    }

    /// Recompute every reachable node's `model_matrix` and `mvp` from the
    /// given parents of the root, extracting point lights into `lights`
    /// along the way.
    ///
    /// The per-frame call passes the identity world matrix and the camera's
    /// view-projection; matrices read before this call are stale. `lights`
    /// is reset here, so at most `lights.capacity()` entries survive and
    /// they are the first point lights in pre-order.
    pub fn propagate(
        &mut self,
        parent_world: Mat4,
        parent_view_projection: Mat4,
        lights: &mut LightBuffer,
    ) {
        lights.reset();
        self.propagate_node(self.root, parent_world, parent_view_projection, lights);
    }

    fn propagate_node(
        &mut self,
        id: NodeId,
        parent_world: Mat4,
        parent_vp: Mat4,
        lights: &mut LightBuffer,
    ) {
        let (model, mvp) = {
            let node = &mut self.nodes[id.0];
            let local = node.transform.local_matrix();
            node.model_matrix = parent_world * local;
            node.mvp = parent_vp * local;
            match node.kind {
                NodeKind::PointLight => {
                    // World position of the node's own origin.
                    let pos = node.model_matrix * Vec4::new(0.0, 0.0, 0.0, 1.0);
                    lights.push(pos.truncate(), node.light_color);
                }
                NodeKind::Geometry | NodeKind::SpotLight | NodeKind::Environment => {}
            }
            (node.model_matrix, node.mvp)
        };
        let child_count = self.nodes[id.0].children.len();
        for i in 0..child_count {
            let child = self.nodes[id.0].children[i];
            self.propagate_node(child, model, mvp, lights);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
