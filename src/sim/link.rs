// In-memory transport that behaves like the wheel controller.
//
// Frames sent by the executor are decoded into register state; register
// reads answer from that state. `advance` integrates the decoded wheel
// speeds into the pose and tests it against the obstacle list, so the
// whole codec-to-kinematics path runs without hardware.

use std::collections::VecDeque;
use std::io;

use tracing::{debug, warn};

use crate::config::ROBOT_RADIUS_MM;
use crate::motor::protocol::{Mode, ReadRegister, StatusFlags, WriteRegister, FRAME_HEADER};
use crate::sim::kinematics::{integrate, wheel_speeds_from_registers, Pose};
use crate::sim::obstacle::Obstacle;
use crate::transport::{Transport, TransportError};
use crate::units::mm_per_encoder_count;

/// Simulated supply voltage reported by the volts register.
const SIM_VOLTS: u8 = 24;

/// Firmware revision reported by the version register.
const SIM_VERSION: u8 = 1;

/// Simulated controller and environment behind the transport contract.
pub struct SimLink {
    mode: Mode,
    raw_speed1: u8,
    raw_speed2: u8,
    acceleration: u8,
    sim_speed_tenths: u8,
    status: StatusFlags,
    pose: Pose,
    robot_radius: f64,
    obstacles: Vec<Obstacle>,
    collided_with: Option<usize>,
    encoder1_mm: f64,
    encoder2_mm: f64,
    reply: VecDeque<u8>,
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SimLink {
    pub fn new() -> Self {
        Self {
            // Controller power-on state: mode 0 with both wheels at the
            // 128 center stop
            mode: Mode::Unsigned,
            raw_speed1: 128,
            raw_speed2: 128,
            acceleration: 5,
            sim_speed_tenths: 10,
            status: StatusFlags::default(),
            pose: Pose::default(),
            robot_radius: ROBOT_RADIUS_MM,
            obstacles: Vec::new(),
            collided_with: None,
            encoder1_mm: 0.0,
            encoder2_mm: 0.0,
            reply: VecDeque::new(),
        }
    }

    pub fn with_obstacles(obstacles: Vec<Obstacle>) -> Self {
        Self {
            obstacles,
            ..Self::new()
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Index of the obstacle first hit, if any.
    pub fn collided_with(&self) -> Option<usize> {
        self.collided_with
    }

    /// Current wheel speeds in mm/s as the controller would drive them.
    pub fn wheel_speeds(&self) -> (f64, f64) {
        wheel_speeds_from_registers(self.mode, self.raw_speed1, self.raw_speed2)
    }

    /// Advance the simulation by `dt_secs` of robot time.
    ///
    /// After a collision the wheels stay frozen at stop until the pose is
    /// reset.
    pub fn advance(&mut self, dt_secs: f64) {
        if self.collided_with.is_some() {
            return;
        }

        let (v1, v2) = self.wheel_speeds();
        integrate(&mut self.pose, v1, v2, dt_secs, self.robot_radius);
        self.encoder1_mm += v1 * dt_secs;
        self.encoder2_mm += v2 * dt_secs;

        if let Some(index) = self
            .obstacles
            .iter()
            .position(|o| o.intersects(self.pose.x, self.pose.y, self.robot_radius))
        {
            warn!("Collision with obstacle {} at {:?}", index, self.pose);
            self.collided_with = Some(index);
            self.freeze();
        }
    }

    /// Clear a collision and place the robot at a new pose.
    pub fn reset(&mut self, pose: Pose) {
        self.pose = pose;
        self.collided_with = None;
    }

    fn freeze(&mut self) {
        let stop = match self.mode {
            Mode::Unsigned | Mode::UnsignedCombined => 128,
            Mode::Signed | Mode::SignedCombined => 0,
        };
        self.raw_speed1 = stop;
        self.raw_speed2 = stop;
    }

    fn encoder_count(mm: f64) -> i32 {
        (mm / mm_per_encoder_count()).trunc() as i32
    }

    fn apply_write(&mut self, register: WriteRegister, payload: &[u8]) {
        let byte = |i: usize| payload.get(i).copied().unwrap_or(0);
        let word = |i: usize| i16::from_be_bytes([byte(i), byte(i + 1)]);

        match register {
            WriteRegister::Speed1 => self.raw_speed1 = byte(0),
            WriteRegister::Speed2 => self.raw_speed2 = byte(0),
            WriteRegister::Acceleration => self.acceleration = byte(0),
            WriteRegister::Mode => {
                if let Some(mode) = Mode::from_byte(byte(0)) {
                    self.mode = mode;
                    self.freeze();
                }
            }
            WriteRegister::ResetEncoders => {
                self.encoder1_mm = 0.0;
                self.encoder2_mm = 0.0;
            }
            // The simulated controller has no regulator or watchdog to
            // toggle; accept and ignore
            WriteRegister::DisableRegulator
            | WriteRegister::EnableRegulator
            | WriteRegister::DisableTimeout
            | WriteRegister::EnableTimeout => {}
            WriteRegister::SimX => self.pose.x = word(0) as f64,
            WriteRegister::SimY => self.pose.y = word(0) as f64,
            WriteRegister::SimAngle => {
                self.pose = Pose::new(self.pose.x, self.pose.y, word(0) as f64 / 10.0);
            }
            WriteRegister::SimSpeed => self.sim_speed_tenths = byte(0),
        }
        debug!("Sim write {:?} <- {:02X?}", register, payload);
    }

    fn queue_read(&mut self, register: ReadRegister) {
        let bytes: Vec<u8> = match register {
            ReadRegister::Speed1 => vec![self.raw_speed1],
            ReadRegister::Speed2 => vec![self.raw_speed2],
            ReadRegister::Encoder1 => {
                Self::encoder_count(self.encoder1_mm).to_be_bytes().to_vec()
            }
            ReadRegister::Encoder2 => {
                Self::encoder_count(self.encoder2_mm).to_be_bytes().to_vec()
            }
            ReadRegister::Encoders => {
                let mut both = Self::encoder_count(self.encoder1_mm).to_be_bytes().to_vec();
                both.extend_from_slice(&Self::encoder_count(self.encoder2_mm).to_be_bytes());
                both
            }
            ReadRegister::Volts => vec![SIM_VOLTS],
            ReadRegister::Current1 | ReadRegister::Current2 => vec![0],
            ReadRegister::Version => vec![SIM_VERSION],
            ReadRegister::Acceleration => vec![self.acceleration],
            ReadRegister::Mode => vec![self.mode as u8],
            ReadRegister::VoltsAndCurrents => vec![SIM_VOLTS, 0, 0],
            ReadRegister::Status => vec![status_byte(self.status)],
            ReadRegister::SimSpeed => vec![self.sim_speed_tenths],
        };
        self.reply.extend(bytes);
    }
}

fn status_byte(flags: StatusFlags) -> u8 {
    let mut byte = 0;
    for (bit, set) in [
        flags.under_voltage,
        flags.over_voltage,
        flags.motor1_trip,
        flags.motor2_trip,
        flags.motor1_short,
        flags.motor2_short,
    ]
    .into_iter()
    .enumerate()
    {
        if set {
            byte |= 1 << bit;
        }
    }
    byte
}

fn malformed(reason: String) -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::InvalidData, reason))
}

impl Transport for SimLink {
    fn send(&mut self, bytes: &[u8], _timeout_ms: u64) -> Result<(), TransportError> {
        let mut cursor = 0;
        while cursor < bytes.len() {
            if bytes[cursor] != FRAME_HEADER {
                return Err(malformed(format!(
                    "expected frame header at offset {cursor}, got 0x{:02X}",
                    bytes[cursor]
                )));
            }
            let register_byte = *bytes
                .get(cursor + 1)
                .ok_or_else(|| malformed("frame truncated at register byte".into()))?;
            cursor += 2;

            if let Some(register) = WriteRegister::from_byte(register_byte) {
                let len = register.payload_len();
                let payload = bytes
                    .get(cursor..cursor + len)
                    .ok_or_else(|| malformed(format!("frame truncated in 0x{register_byte:02X} payload")))?;
                self.apply_write(register, payload);
                cursor += len;
            } else if let Some(register) = ReadRegister::from_byte(register_byte) {
                self.queue_read(register);
            } else {
                return Err(malformed(format!("unknown register 0x{register_byte:02X}")));
            }
        }
        Ok(())
    }

    fn receive(
        &mut self,
        n: usize,
        _timeout_ms: u64,
        _blocking: bool,
    ) -> Result<Vec<u8>, TransportError> {
        let take = n.min(self.reply.len());
        Ok(self.reply.drain(..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::protocol;
    use crate::sim::obstacle::Rect;

    #[test]
    fn test_speed_write_then_advance_moves_straight() {
        let mut link = SimLink::new();
        link.send(&protocol::set_mode(Mode::Signed), 0).unwrap();
        link.send(&protocol::set_speeds(20, 20), 0).unwrap();

        link.advance(2.0);
        let pose = link.pose();
        // 20 units = 125 mm/s along the zero heading
        assert!((pose.x - 250.0).abs() < 1e-6);
        assert!(pose.y.abs() < 1e-6);
        assert_eq!(pose.angle, 0.0);
    }

    #[test]
    fn test_power_on_state_is_stopped() {
        let mut link = SimLink::new();
        link.advance(5.0);
        assert_eq!(link.pose(), Pose::default());
    }

    #[test]
    fn test_mode_change_freezes_wheels() {
        let mut link = SimLink::new();
        link.send(&protocol::set_mode(Mode::Signed), 0).unwrap();
        assert_eq!(link.wheel_speeds(), (0.0, 0.0));
    }

    #[test]
    fn test_encoder_reads_track_distance() {
        let mut link = SimLink::new();
        link.send(&protocol::set_mode(Mode::Signed), 0).unwrap();
        link.send(&protocol::set_speeds(20, -20), 0).unwrap();
        link.advance(1.0);

        link.send(&protocol::read_request(ReadRegister::Encoders), 0)
            .unwrap();
        let bytes = link.receive(8, 0, true).unwrap();
        let (e1, e2) = protocol::decode_encoders(&bytes);
        let expected = SimLink::encoder_count(125.0);
        assert_eq!(e1, expected);
        assert_eq!(e2, -expected);
    }

    #[test]
    fn test_pose_setter_frames() {
        let mut link = SimLink::new();
        link.send(&protocol::set_sim_pose(300, -50, 905), 0).unwrap();
        let pose = link.pose();
        assert_eq!(pose.x, 300.0);
        assert_eq!(pose.y, -50.0);
        assert!((pose.angle - 90.5).abs() < 1e-9);
    }

    #[test]
    fn test_collision_freezes_motion() {
        // Wall 300 mm ahead; robot radius 250 reaches it quickly
        let wall = Obstacle::RectangleFilled {
            rect: Rect::new(400.0, -500.0, 100.0, 1000.0),
        };
        let mut link = SimLink::with_obstacles(vec![wall]);
        link.send(&protocol::set_mode(Mode::Signed), 0).unwrap();
        link.send(&protocol::set_speeds(20, 20), 0).unwrap();

        link.advance(2.0); // reaches x = 250, circle touches x = 500
        assert!(link.collided_with().is_some());

        let frozen = link.pose();
        link.advance(5.0);
        assert_eq!(link.pose(), frozen);
        assert_eq!(link.wheel_speeds(), (0.0, 0.0));

        link.reset(Pose::default());
        assert!(link.collided_with().is_none());
    }

    #[test]
    fn test_unknown_register_rejected() {
        let mut link = SimLink::new();
        assert!(link.send(&[0x00, 0x7F], 0).is_err());
        assert!(link.send(&[0x13, 0x31, 0], 0).is_err());
    }

    #[test]
    fn test_status_read_round_trip() {
        let mut link = SimLink::new();
        link.status.motor2_short = true;
        link.status.under_voltage = true;
        link.send(&protocol::read_request(ReadRegister::Status), 0)
            .unwrap();
        let bytes = link.receive(1, 0, true).unwrap();
        assert_eq!(bytes, vec![0b100001]);
        let decoded = StatusFlags::from_byte(bytes[0]);
        assert!(decoded.motor2_short && decoded.under_voltage);
        assert!(!decoded.motor1_trip);
    }
}
