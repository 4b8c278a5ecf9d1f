pub mod control_plane;
pub mod request_id;

pub use control_plane::ControlPlane;
pub use request_id::{RequestId, RequestIdMiddleware};
