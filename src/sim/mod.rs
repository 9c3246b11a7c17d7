// Simulated variant of the drive base
//
// Provides:
// - Forward-kinematics pose integration
// - Static obstacle shapes and circle-intersection tests
// - An in-memory controller behind the transport contract

pub mod kinematics;
pub mod link;
pub mod obstacle;

pub use kinematics::{integrate, normalize_degrees, wheel_speeds_from_registers, Pose};
pub use link::SimLink;
pub use obstacle::{Obstacle, Rect};
