use gnomon_common::NodeId;
use gnomon_scene::{LightBuffer, NodeKind, SceneGraph};

/// Scene inspector for developer tooling.
///
/// Read-only queries over the scene graph for logging and the diagnostics
/// overlay.
pub struct SceneInspector;

impl SceneInspector {
    /// Summarize the subtree reachable from the root.
    pub fn summary(graph: &SceneGraph, lights: &LightBuffer) -> SceneSummary {
        let mut summary = SceneSummary {
            node_count: 0,
            geometry: 0,
            point_lights: 0,
            spot_lights: 0,
            environment: 0,
            with_mesh: 0,
            textured: 0,
            lights_in_use: lights.len(),
            light_capacity: lights.capacity(),
        };
        graph.visit(graph.root(), &mut |_, node| {
            summary.node_count += 1;
            match node.kind {
                NodeKind::Geometry => summary.geometry += 1,
                NodeKind::PointLight => summary.point_lights += 1,
                NodeKind::SpotLight => summary.spot_lights += 1,
                NodeKind::Environment => summary.environment += 1,
            }
            if node.mesh.is_some() {
                summary.with_mesh += 1;
            }
            if node.texture.is_some() {
                summary.textured += 1;
            }
        });
        summary
    }

    /// Describe one node.
    pub fn inspect_node(graph: &SceneGraph, id: NodeId) -> NodeInfo {
        let node = graph.node(id);
        let p = node.transform.position;
        NodeInfo {
            id,
            kind: node.kind,
            position: [p.x, p.y, p.z],
            children: node.children().len(),
            has_mesh: node.mesh.is_some(),
            has_texture: node.texture.is_some(),
        }
    }
}

/// Counts of everything the scene holds, for the startup log and overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSummary {
    pub node_count: usize,
    pub geometry: usize,
    pub point_lights: usize,
    pub spot_lights: usize,
    pub environment: usize,
    pub with_mesh: usize,
    pub textured: usize,
    pub lights_in_use: usize,
    pub light_capacity: usize,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: nodes={} geometry={} lights={}/{} meshes={} textured={}",
            self.node_count,
            self.geometry,
            self.lights_in_use,
            self.light_capacity,
            self.with_mesh,
            self.textured
        )
    }
}

/// Detailed info about a single node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: [f32; 3],
    pub children: usize,
    pub has_mesh: bool,
    pub has_texture: bool,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node {} {:?} pos=({:.2}, {:.2}, {:.2}) children={}{}{}",
            self.id.0,
            self.kind,
            self.position[0],
            self.position[1],
            self.position[2],
            self.children,
            if self.has_mesh { " mesh" } else { "" },
            if self.has_texture { " textured" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use gnomon_common::{MeshHandle, TextureHandle};
    use gnomon_scene::MeshRef;

    fn demo_graph() -> SceneGraph {
        let mut graph = SceneGraph::new();
        let light = graph.create_node();
        graph.node_mut(light).kind = NodeKind::PointLight;
        graph.add_child(graph.root(), light);

        let ground = graph.create_node();
        {
            let node = graph.node_mut(ground);
            node.mesh = Some(MeshRef {
                handle: MeshHandle(1),
                index_count: 6,
            });
            node.texture = Some(TextureHandle(1));
        }
        graph.add_child(graph.root(), ground);

        let marker = graph.create_node();
        graph.node_mut(marker).mesh = Some(MeshRef {
            handle: MeshHandle(2),
            index_count: 36,
        });
        graph.add_child(ground, marker);
        graph
    }

    #[test]
    fn summary_counts_kinds_and_resources() {
        let mut graph = demo_graph();
        let mut lights = LightBuffer::new(3);
        graph.propagate(Mat4::IDENTITY, Mat4::IDENTITY, &mut lights);

        let summary = SceneInspector::summary(&graph, &lights);
        assert_eq!(summary.node_count, 4);
        assert_eq!(summary.geometry, 3); // root counts as geometry kind
        assert_eq!(summary.point_lights, 1);
        assert_eq!(summary.with_mesh, 2);
        assert_eq!(summary.textured, 1);
        assert_eq!(summary.lights_in_use, 1);
        assert_eq!(summary.light_capacity, 3);
    }

    #[test]
    fn summary_ignores_unparented_nodes() {
        let mut graph = demo_graph();
        graph.create_node(); // never adopted
        let lights = LightBuffer::new(1);
        let summary = SceneInspector::summary(&graph, &lights);
        assert_eq!(summary.node_count, 4);
        assert!(graph.node_count() > summary.node_count);
    }

    #[test]
    fn inspect_node_reports_shape() {
        let graph = demo_graph();
        let root_info = SceneInspector::inspect_node(&graph, graph.root());
        assert_eq!(root_info.children, 2);
        assert!(!root_info.has_mesh);
    }

    #[test]
    fn summary_display_is_compact() {
        let mut graph = SceneGraph::new();
        let light = graph.create_node();
        {
            let node = graph.node_mut(light);
            node.kind = NodeKind::PointLight;
            node.transform.position = Vec3::new(0.0, 100.0, 50.0);
        }
        graph.add_child(graph.root(), light);
        let mut lights = LightBuffer::new(1);
        graph.propagate(Mat4::IDENTITY, Mat4::IDENTITY, &mut lights);

        let text = format!("{}", SceneInspector::summary(&graph, &lights));
        assert!(text.contains("nodes=2"));
        assert!(text.contains("lights=1/1"));
    }
}
