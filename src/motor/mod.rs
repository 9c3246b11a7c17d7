// Motor control module for the differential-drive base
//
// Provides:
// - The motion command model
// - The register protocol codec for the two-channel wheel controller
// - The queue-draining motion executor

pub mod command;
pub mod executor;
pub mod protocol;

pub use command::Command;
pub use executor::{CommandQueue, ExecutorConfig, ExecutorError, HealthReport, MotionExecutor};
pub use protocol::{Mode, ProtocolError, ReadRegister, StatusFlags, WriteRegister};
