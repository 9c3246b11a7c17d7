// Motion commands accepted by the executor.
//
// Each command is an immutable description of one motion instruction;
// it is enqueued once, translated into register frames once, and dropped.

use serde::{Deserialize, Serialize};

/// One motion instruction.
///
/// Speeds are signed drive units in [-127, 127] per wheel. `ms` is a
/// duration in milliseconds, `mm` a distance in millimeters and `degrees`
/// a rotation amount; distances and durations must be non-negative, while
/// degrees are signed (the sign picks the turn direction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    /// Hold the given wheel speeds for a duration.
    SetSpeedForTime { speed1: i8, speed2: i8, ms: f64 },
    /// Hold the given wheel speeds over a distance. Declared by the
    /// controller interface but not supported by this executor.
    SetSpeedForDistance { speed1: i8, speed2: i8, mm: f64 },
    /// Hold the given wheel speeds until the base has turned by the given
    /// signed angle.
    SetSpeedForDegrees { speed1: i8, speed2: i8, degrees: f64 },
    MoveForwardForTime { speed: i8, ms: f64 },
    MoveForwardForDistance { speed: i8, mm: f64 },
    MoveBackwardForTime { speed: i8, ms: f64 },
    MoveBackwardForDistance { speed: i8, mm: f64 },
    RotateLeftForTime { speed: i8, ms: f64 },
    RotateLeftForDegrees { speed: i8, degrees: f64 },
    RotateRightForTime { speed: i8, ms: f64 },
    RotateRightForDegrees { speed: i8, degrees: f64 },
    /// Zero both wheels and reset the drive mode, skipping any timed wait.
    Stop,
}

impl Command {
    /// Short human-readable form used in status events and logs.
    pub fn describe(&self) -> String {
        match self {
            Command::SetSpeedForTime { speed1, speed2, ms } => {
                format!("set speeds ({speed1}, {speed2}) for {ms} ms")
            }
            Command::SetSpeedForDistance { speed1, speed2, mm } => {
                format!("set speeds ({speed1}, {speed2}) for {mm} mm")
            }
            Command::SetSpeedForDegrees {
                speed1,
                speed2,
                degrees,
            } => format!("set speeds ({speed1}, {speed2}) for {degrees} deg"),
            Command::MoveForwardForTime { speed, ms } => {
                format!("forward at {speed} for {ms} ms")
            }
            Command::MoveForwardForDistance { speed, mm } => {
                format!("forward at {speed} for {mm} mm")
            }
            Command::MoveBackwardForTime { speed, ms } => {
                format!("backward at {speed} for {ms} ms")
            }
            Command::MoveBackwardForDistance { speed, mm } => {
                format!("backward at {speed} for {mm} mm")
            }
            Command::RotateLeftForTime { speed, ms } => {
                format!("rotate left at {speed} for {ms} ms")
            }
            Command::RotateLeftForDegrees { speed, degrees } => {
                format!("rotate left at {speed} for {degrees} deg")
            }
            Command::RotateRightForTime { speed, ms } => {
                format!("rotate right at {speed} for {ms} ms")
            }
            Command::RotateRightForDegrees { speed, degrees } => {
                format!("rotate right at {speed} for {degrees} deg")
            }
            Command::Stop => "stop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_round_trip() {
        let cmd = Command::SetSpeedForTime {
            speed1: 20,
            speed2: -20,
            ms: 1500.0,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"SetSpeedForTime\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_stop_json_shape() {
        let json = serde_json::to_string(&Command::Stop).unwrap();
        assert_eq!(json, "{\"type\":\"Stop\"}");
    }
}
