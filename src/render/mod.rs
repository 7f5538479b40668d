//! Viewport-side pieces of the tool: pick data and resolution, the view
//! camera, ray picking for the in-memory host, and the cursor annotation.

pub mod annotation;
pub mod camera;
pub mod pick;
pub mod raycast;

pub use annotation::{draw_label, AnnotationStyle, Bounds2d, RecordingSurface, ViewSurface};
pub use camera::{Ray, ViewCamera};
pub use pick::{resolve, visible_material, PathNode, PickHelper, PickList, PickRecord};
