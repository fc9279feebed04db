use glam::{Mat4, Vec3};
use gnomon_common::{MeshHandle, NodeId, TextureHandle, Transform};

/// What a node contributes to the frame. Closed set: every traversal
/// matches all variants so a new kind fails to compile until handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Opaque geometry, drawn in both passes.
    Geometry,
    /// Omnidirectional light; position extracted during propagation.
    PointLight,
    /// Directed light; reserved in the content set, never extracted.
    SpotLight,
    /// Backdrop marker; drawn by the dedicated backdrop pass only.
    Environment,
}

/// GPU geometry bound to a node: an uploaded mesh plus the index count
/// its draw call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRef {
    pub handle: MeshHandle,
    pub index_count: u32,
}

/// One node in the scene graph.
///
/// `model_matrix` and `mvp` are outputs of [`SceneGraph::propagate`]
/// (recomputed every frame, never authored). Everything else is authored
/// at scene-build time.
///
/// [`SceneGraph::propagate`]: crate::SceneGraph::propagate
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub transform: Transform,
    /// Meaningful only for light kinds.
    pub light_color: Vec3,
    /// Absent for pure light or marker nodes.
    pub mesh: Option<MeshRef>,
    /// Presence of the handle is the authoritative "textured" signal.
    pub texture: Option<TextureHandle>,
    pub model_matrix: Mat4,
    pub mvp: Mat4,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl SceneNode {
    pub(crate) fn new() -> Self {
        Self {
            kind: NodeKind::Geometry,
            transform: Transform::default(),
            light_color: Vec3::ONE,
            mesh: None,
            texture: None,
            model_matrix: Mat4::IDENTITY,
            mvp: Mat4::IDENTITY,
            children: Vec::new(),
            parent: None,
        }
    }

    /// Child ids in insertion order. Insertion order is traversal order,
    /// which fixes light-slot assignment.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
