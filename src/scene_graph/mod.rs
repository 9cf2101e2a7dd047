pub mod node;
pub mod scene;
pub mod transform;

pub use node::{Geometry, NodeId, NodeTemplate, SceneNode};
pub use scene::Scene;
pub use transform::Transform;
