// Motion-control and kinematics engine for a differential-drive base.
//
// High-level movement commands become timed, byte-exact register writes
// for a two-wheel motor controller; the simulated variant feeds the same
// frames through forward kinematics and obstacle tests instead of a
// serial port.

pub mod config;
pub mod events;
pub mod motor;
pub mod sim;
pub mod transport;
pub mod units;

pub use events::StatusEvent;
pub use motor::{Command, CommandQueue, ExecutorConfig, ExecutorError, MotionExecutor};
pub use transport::{SerialLink, Transport, TransportError};
