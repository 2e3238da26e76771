//! Scene management
//!
//! A [`Scene`] is a flat list of named nodes. Payloads are shared with their
//! creators through `Arc<RwLock<_>>`, so the application can keep mutating the
//! camera or model it handed over. Consumers walk the nodes with a
//! [`SceneVisitor`].

mod camera;
mod camera_controller;
mod light;
mod transform;
mod visitor;

use std::sync::Arc;

use parking_lot::RwLock;

pub use camera::*;
pub use camera_controller::*;
pub use light::*;
pub use transform::*;
pub use visitor::*;

use crate::resources::Model;

/// A named entry in the scene
#[derive(Debug, Clone)]
pub enum SceneNode {
    Camera {
        name: String,
        camera: Arc<RwLock<Camera>>,
    },
    Light {
        name: String,
        light: Arc<RwLock<PointLight>>,
    },
    Model {
        name: String,
        model: Arc<RwLock<Model>>,
        transform: Transform,
    },
}

impl SceneNode {
    pub fn camera(name: &str, camera: Arc<RwLock<Camera>>) -> Self {
        SceneNode::Camera {
            name: name.to_string(),
            camera,
        }
    }

    pub fn light(name: &str, light: Arc<RwLock<PointLight>>) -> Self {
        SceneNode::Light {
            name: name.to_string(),
            light,
        }
    }

    pub fn model(name: &str, model: Arc<RwLock<Model>>) -> Self {
        SceneNode::Model {
            name: name.to_string(),
            model,
            transform: Transform::default(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SceneNode::Camera { name, .. } | SceneNode::Light { name, .. } | SceneNode::Model { name, .. } => name,
        }
    }
}

/// Operations applied to each node kind during traversal
pub trait SceneVisitor {
    fn visit_camera(&mut self, name: &str, camera: &Arc<RwLock<Camera>>);
    fn visit_light(&mut self, name: &str, light: &Arc<RwLock<PointLight>>);
    fn visit_model(&mut self, name: &str, model: &Arc<RwLock<Model>>, transform: &mut Transform);
}

/// The nodes making up the viewed scene, in insertion order
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) {
        log::debug!("Scene node added: {}", node.name());
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    pub fn accept_visitor(&mut self, visitor: &mut dyn SceneVisitor) {
        for node in &mut self.nodes {
            match node {
                SceneNode::Camera { name, camera } => visitor.visit_camera(name, camera),
                SceneNode::Light { name, light } => visitor.visit_light(name, light),
                SceneNode::Model {
                    name,
                    model,
                    transform,
                } => visitor.visit_model(name, model, transform),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SceneVisitor for Recorder {
        fn visit_camera(&mut self, name: &str, _camera: &Arc<RwLock<Camera>>) {
            self.0.push(format!("camera:{name}"));
        }

        fn visit_light(&mut self, name: &str, _light: &Arc<RwLock<PointLight>>) {
            self.0.push(format!("light:{name}"));
        }

        fn visit_model(&mut self, name: &str, _model: &Arc<RwLock<Model>>, transform: &mut Transform) {
            transform.position.y += 1.0;
            self.0.push(format!("model:{name}"));
        }
    }

    #[test]
    fn visitor_sees_nodes_in_insertion_order() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::camera("camera", Arc::default()));
        scene.add_node(SceneNode::light("point light", Arc::default()));
        scene.add_node(SceneNode::model("tea set", Arc::default()));

        let mut recorder = Recorder::default();
        scene.accept_visitor(&mut recorder);
        assert_eq!(recorder.0, vec!["camera:camera", "light:point light", "model:tea set"]);
    }

    #[test]
    fn payloads_are_shared() {
        let camera = Arc::new(RwLock::new(Camera::new()));
        let mut scene = Scene::new();
        scene.add_node(SceneNode::camera("camera", Arc::clone(&camera)));

        camera.write().position = glam::Vec3::new(3.0, 0.0, 0.0);
        let Some(SceneNode::Camera { camera: shared, .. }) = scene.find("camera") else {
            panic!("camera node missing");
        };
        assert_eq!(shared.read().position.x, 3.0);
    }

    #[test]
    fn visitors_can_edit_model_transforms() {
        let mut scene = Scene::new();
        scene.add_node(SceneNode::model("tea set", Arc::default()));
        scene.accept_visitor(&mut Recorder::default());
        let Some(SceneNode::Model { transform, .. }) = scene.find("tea set") else {
            panic!("model node missing");
        };
        assert_eq!(transform.position.y, 1.0);
    }
}
