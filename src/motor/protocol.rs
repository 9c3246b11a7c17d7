// Register protocol for the two-channel wheel controller
//
// Every operation is a short frame: [0x00, register, payload...].
// Write payloads are 0, 1 or 2 bytes, big-endian. Multi-field operations
// concatenate several frames into one send buffer. Read registers have a
// fixed response length; anything shorter is a protocol error.

use tracing::debug;

use crate::transport::{Transport, TransportError};
use crate::units::signed_to_unsigned;

/// Leading address byte of every frame.
pub const FRAME_HEADER: u8 = 0x00;

/// Writable registers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRegister {
    Speed1 = 0x31,
    Speed2 = 0x32,
    Acceleration = 0x33,
    Mode = 0x34,
    ResetEncoders = 0x35,
    DisableRegulator = 0x36,
    EnableRegulator = 0x37,
    DisableTimeout = 0x38,
    EnableTimeout = 0x39,

    // Simulation-only pose and pacing setters
    SimX = 0x41,
    SimY = 0x42,
    SimAngle = 0x43,
    SimSpeed = 0x51,
}

impl WriteRegister {
    /// Payload bytes following the register byte in a write frame.
    pub fn payload_len(self) -> usize {
        match self {
            WriteRegister::Speed1
            | WriteRegister::Speed2
            | WriteRegister::Acceleration
            | WriteRegister::Mode
            | WriteRegister::SimSpeed => 1,
            WriteRegister::SimX | WriteRegister::SimY | WriteRegister::SimAngle => 2,
            _ => 0,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x31 => WriteRegister::Speed1,
            0x32 => WriteRegister::Speed2,
            0x33 => WriteRegister::Acceleration,
            0x34 => WriteRegister::Mode,
            0x35 => WriteRegister::ResetEncoders,
            0x36 => WriteRegister::DisableRegulator,
            0x37 => WriteRegister::EnableRegulator,
            0x38 => WriteRegister::DisableTimeout,
            0x39 => WriteRegister::EnableTimeout,
            0x41 => WriteRegister::SimX,
            0x42 => WriteRegister::SimY,
            0x43 => WriteRegister::SimAngle,
            0x51 => WriteRegister::SimSpeed,
            _ => return None,
        })
    }
}

/// Readable registers with their fixed response lengths.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRegister {
    Speed1 = 0x21,
    Speed2 = 0x22,
    Encoder1 = 0x23,
    Encoder2 = 0x24,
    Encoders = 0x25,
    Volts = 0x26,
    Current1 = 0x27,
    Current2 = 0x28,
    Version = 0x29,
    Acceleration = 0x2A,
    Mode = 0x2B,
    VoltsAndCurrents = 0x2C,
    Status = 0x2D,
    SimSpeed = 0x52,
}

impl ReadRegister {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x21 => ReadRegister::Speed1,
            0x22 => ReadRegister::Speed2,
            0x23 => ReadRegister::Encoder1,
            0x24 => ReadRegister::Encoder2,
            0x25 => ReadRegister::Encoders,
            0x26 => ReadRegister::Volts,
            0x27 => ReadRegister::Current1,
            0x28 => ReadRegister::Current2,
            0x29 => ReadRegister::Version,
            0x2A => ReadRegister::Acceleration,
            0x2B => ReadRegister::Mode,
            0x2C => ReadRegister::VoltsAndCurrents,
            0x2D => ReadRegister::Status,
            0x52 => ReadRegister::SimSpeed,
            _ => return None,
        })
    }

    /// Exact number of response bytes the controller returns.
    pub fn response_len(self) -> usize {
        match self {
            ReadRegister::Encoder1 | ReadRegister::Encoder2 => 4,
            ReadRegister::Encoders => 8,
            ReadRegister::VoltsAndCurrents => 3,
            _ => 1,
        }
    }
}

/// Speed-register interpretation modes.
///
/// Modes 0/1 drive each wheel from its own register; modes 2/3 treat
/// speed1 as a combined drive value and speed2 as a turn differential.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Controller power-on default: 128 is stop, 0 full reverse.
    #[default]
    Unsigned = 0,
    Signed = 1,
    UnsignedCombined = 2,
    SignedCombined = 3,
}

impl Mode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Mode::Unsigned,
            1 => Mode::Signed,
            2 => Mode::UnsignedCombined,
            3 => Mode::SignedCombined,
            _ => return None,
        })
    }
}

/// Errors from the codec layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Short read on register 0x{register:02X}: expected {expected} bytes, got {got}")]
    ShortRead {
        register: u8,
        expected: usize,
        got: usize,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

fn frame(register: WriteRegister, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + payload.len());
    bytes.push(FRAME_HEADER);
    bytes.push(register as u8);
    bytes.extend_from_slice(payload);
    bytes
}

/// Set one wheel speed register.
pub fn set_speed1(speed: i8) -> Vec<u8> {
    frame(WriteRegister::Speed1, &[signed_to_unsigned(speed)])
}

pub fn set_speed2(speed: i8) -> Vec<u8> {
    frame(WriteRegister::Speed2, &[signed_to_unsigned(speed)])
}

/// Set both wheel speeds in one send.
pub fn set_speeds(speed1: i8, speed2: i8) -> Vec<u8> {
    let mut bytes = set_speed1(speed1);
    bytes.extend_from_slice(&set_speed2(speed2));
    bytes
}

/// Set both speeds to zero and re-assert the signed drive mode in one
/// send. In signed mode a zero speed byte is a hard stop.
pub fn stop_all() -> Vec<u8> {
    let mut bytes = set_speeds(0, 0);
    bytes.extend_from_slice(&set_mode(Mode::Signed));
    bytes
}

pub fn set_acceleration(steps: u8) -> Vec<u8> {
    frame(WriteRegister::Acceleration, &[steps])
}

pub fn set_mode(mode: Mode) -> Vec<u8> {
    frame(WriteRegister::Mode, &[mode as u8])
}

pub fn reset_encoders() -> Vec<u8> {
    frame(WriteRegister::ResetEncoders, &[])
}

pub fn disable_regulator() -> Vec<u8> {
    frame(WriteRegister::DisableRegulator, &[])
}

pub fn enable_regulator() -> Vec<u8> {
    frame(WriteRegister::EnableRegulator, &[])
}

pub fn disable_timeout() -> Vec<u8> {
    frame(WriteRegister::DisableTimeout, &[])
}

pub fn enable_timeout() -> Vec<u8> {
    frame(WriteRegister::EnableTimeout, &[])
}

/// Set the full simulated pose in one send: x and y in whole millimeters,
/// angle in tenths of a degree, each as a big-endian 16-bit sub-frame.
pub fn set_sim_pose(x_mm: i16, y_mm: i16, angle_tenths: u16) -> Vec<u8> {
    let mut bytes = frame(WriteRegister::SimX, &x_mm.to_be_bytes());
    bytes.extend_from_slice(&frame(WriteRegister::SimY, &y_mm.to_be_bytes()));
    bytes.extend_from_slice(&frame(WriteRegister::SimAngle, &angle_tenths.to_be_bytes()));
    bytes
}

/// Set the simulation pacing multiplier, encoded as factor x 10.
pub fn set_sim_speed(factor_tenths: u8) -> Vec<u8> {
    frame(WriteRegister::SimSpeed, &[factor_tenths])
}

/// Request frame for a register read.
pub fn read_request(register: ReadRegister) -> [u8; 2] {
    [FRAME_HEADER, register as u8]
}

/// Issue a register read and return exactly the expected response bytes.
///
/// A short response is surfaced as [`ProtocolError::ShortRead`] so the
/// caller can tell a silent controller from a genuine zero reading.
pub fn read_register<T: Transport>(
    transport: &mut T,
    register: ReadRegister,
    timeout_ms: u64,
) -> Result<Vec<u8>> {
    let expected = register.response_len();
    transport.send(&read_request(register), timeout_ms)?;
    let bytes = transport.receive(expected, timeout_ms, true)?;
    debug!("Read 0x{:02X}: {:02X?}", register as u8, bytes);

    if bytes.len() < expected {
        return Err(ProtocolError::ShortRead {
            register: register as u8,
            expected,
            got: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Decode a 4-byte big-endian encoder response.
pub fn decode_encoder(bytes: &[u8]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode the combined 8-byte encoder response.
pub fn decode_encoders(bytes: &[u8]) -> (i32, i32) {
    (decode_encoder(&bytes[..4]), decode_encoder(&bytes[4..8]))
}

/// Independent fault flags decoded from the status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusFlags {
    pub under_voltage: bool,
    pub over_voltage: bool,
    pub motor1_trip: bool,
    pub motor2_trip: bool,
    pub motor1_short: bool,
    pub motor2_short: bool,
}

impl StatusFlags {
    /// Decode the status byte, bits 0 through 5.
    pub fn from_byte(byte: u8) -> Self {
        let bit = |n: u8| byte >> n & 1 != 0;
        Self {
            under_voltage: bit(0),
            over_voltage: bit(1),
            motor1_trip: bit(2),
            motor2_trip: bit(3),
            motor1_short: bit(4),
            motor2_short: bit(5),
        }
    }

    pub fn is_ok(&self) -> bool {
        !(self.under_voltage
            || self.over_voltage
            || self.motor1_trip
            || self.motor2_trip
            || self.motor1_short
            || self.motor2_short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_speeds_frame_bytes() {
        // unsigned(-20) = 236
        assert_eq!(set_speeds(20, -20), vec![0x00, 0x31, 20, 0x00, 0x32, 236]);
    }

    #[test]
    fn test_single_register_frames() {
        assert_eq!(set_speed1(-128), vec![0x00, 0x31, 128]);
        assert_eq!(set_acceleration(5), vec![0x00, 0x33, 5]);
        assert_eq!(set_mode(Mode::SignedCombined), vec![0x00, 0x34, 3]);
        assert_eq!(reset_encoders(), vec![0x00, 0x35]);
        assert_eq!(disable_regulator(), vec![0x00, 0x36]);
        assert_eq!(enable_regulator(), vec![0x00, 0x37]);
        assert_eq!(disable_timeout(), vec![0x00, 0x38]);
        assert_eq!(enable_timeout(), vec![0x00, 0x39]);
    }

    #[test]
    fn test_stop_all_frame() {
        assert_eq!(
            stop_all(),
            vec![0x00, 0x31, 0, 0x00, 0x32, 0, 0x00, 0x34, 1]
        );
    }

    #[test]
    fn test_sim_pose_frame_big_endian() {
        // x = 300 = 0x012C, y = -2 = 0xFFFE, angle = 905 tenths = 0x0389
        assert_eq!(
            set_sim_pose(300, -2, 905),
            vec![0x00, 0x41, 0x01, 0x2C, 0x00, 0x42, 0xFF, 0xFE, 0x00, 0x43, 0x03, 0x89]
        );
    }

    #[test]
    fn test_response_len_table() {
        assert_eq!(ReadRegister::Speed1.response_len(), 1);
        assert_eq!(ReadRegister::Encoder1.response_len(), 4);
        assert_eq!(ReadRegister::Encoder2.response_len(), 4);
        assert_eq!(ReadRegister::Encoders.response_len(), 8);
        assert_eq!(ReadRegister::VoltsAndCurrents.response_len(), 3);
        assert_eq!(ReadRegister::Status.response_len(), 1);
        assert_eq!(ReadRegister::SimSpeed.response_len(), 1);
    }

    #[test]
    fn test_decode_encoders() {
        let bytes = [0x00, 0x00, 0x01, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(decode_encoders(&bytes), (256, -1));
    }

    #[test]
    fn test_status_flags_individual_bits() {
        assert!(StatusFlags::from_byte(0).is_ok());
        assert!(StatusFlags::from_byte(0b000001).under_voltage);
        assert!(StatusFlags::from_byte(0b000010).over_voltage);
        assert!(StatusFlags::from_byte(0b000100).motor1_trip);
        assert!(StatusFlags::from_byte(0b001000).motor2_trip);
        assert!(StatusFlags::from_byte(0b010000).motor1_short);
        assert!(StatusFlags::from_byte(0b100000).motor2_short);

        let all = StatusFlags::from_byte(0b111111);
        assert!(!all.is_ok());
        assert!(all.motor2_short && all.under_voltage);
    }
}
