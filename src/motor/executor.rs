// Motion executor: drains a shared command queue on a dedicated thread,
// translating each command into register frames with real-time pacing.
//
// Producers may enqueue concurrently; the executor thread is the sole
// dequeuer. Stop is cooperative: it atomically clears the pending queue
// but never preempts an in-flight timed wait.

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{
    RECEIVE_TIMEOUT_MS, ROBOT_RADIUS_MM, SEND_TIMEOUT_MS, SPEED_TO_MM_PER_SECOND,
};
use crate::events::StatusEvent;
use crate::motor::command::Command;
use crate::motor::protocol::{self, ProtocolError, ReadRegister, StatusFlags};
use crate::transport::Transport;

/// Errors from command translation and execution.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Invalid parameter for '{command}': {reason}")]
    InvalidParameter { command: String, reason: String },

    #[error("Command '{0}' is not supported by this executor")]
    Unsupported(String),

    #[error("Simulation speed factor must be strictly positive, got {0}")]
    InvalidSpeedFactor(f64),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Every timed wait is divided by this factor. Must be > 0.
    pub sim_speed_factor: f64,
    pub send_timeout_ms: u64,
    pub receive_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sim_speed_factor: 1.0,
            send_timeout_ms: SEND_TIMEOUT_MS,
            receive_timeout_ms: RECEIVE_TIMEOUT_MS,
        }
    }
}

/// Thread-safe handle onto the pending command queue.
///
/// Clones share the same queue. Any thread may push; only the executor
/// removes commands during a drain.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<Command>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command for the executor to run.
    pub fn push(&self, command: Command) {
        self.inner.lock().unwrap().push_back(command);
    }

    /// Cooperative stop: atomically discard all pending commands.
    ///
    /// A wait the executor is already sleeping through runs to completion
    /// before the emptied queue is observed.
    pub fn stop(&self) {
        let mut queue = self.inner.lock().unwrap();
        let dropped = queue.len();
        queue.clear();
        if dropped > 0 {
            info!("Stop requested, dropped {} pending commands", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    fn pop(&self) -> Option<Command> {
        self.inner.lock().unwrap().pop_front()
    }
}

/// Result of a command's pure translation step: the wheel speeds to write
/// and the wait that keeps them applied.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Translated {
    speed1: i8,
    speed2: i8,
    wait_ms: f64,
    reset_mode: bool,
}

fn invalid(command: &Command, reason: &str) -> ExecutorError {
    ExecutorError::InvalidParameter {
        command: command.describe(),
        reason: reason.to_string(),
    }
}

fn require_non_negative(command: &Command, amount: f64, what: &str) -> Result<f64> {
    if amount < 0.0 {
        Err(invalid(command, &format!("{what} must be non-negative")))
    } else {
        Ok(amount)
    }
}

fn negated(command: &Command, speed: i8) -> Result<i8> {
    speed
        .checked_neg()
        .ok_or_else(|| invalid(command, "speed must be in [-127, 127]"))
}

/// Duration in ms for the base to sweep `degrees` with the given wheel
/// speeds: delta-v in mm/ms across the wheelbase, arc length 2*R*radians.
fn degrees_to_wait_ms(command: &Command, speed1: i8, speed2: i8, degrees: f64) -> Result<f64> {
    let delta_v = (speed1 as f64 - speed2 as f64) * SPEED_TO_MM_PER_SECOND / 1000.0;
    if delta_v == 0.0 {
        return Err(invalid(command, "equal wheel speeds cannot turn the base"));
    }
    let radians = degrees * PI / 180.0;
    Ok((2.0 * ROBOT_RADIUS_MM * radians / delta_v).abs())
}

/// Duration in ms to cover `mm` at a symmetric wheel speed.
fn distance_to_wait_ms(command: &Command, speed: i8, mm: f64) -> Result<f64> {
    let mm = require_non_negative(command, mm, "distance")?;
    if speed == 0 {
        return Err(invalid(command, "zero speed cannot cover a distance"));
    }
    Ok(mm / (SPEED_TO_MM_PER_SECOND * (speed as f64).abs()) * 1000.0)
}

/// Translate a command into wheel speeds and a wait, without any I/O.
fn translate(command: &Command) -> Result<Translated> {
    let plain = |speed1: i8, speed2: i8, wait_ms: f64| Translated {
        speed1,
        speed2,
        wait_ms,
        reset_mode: false,
    };

    match *command {
        Command::SetSpeedForTime { speed1, speed2, ms } => {
            let ms = require_non_negative(command, ms, "duration")?;
            Ok(plain(speed1, speed2, ms))
        }
        // Declared by the controller interface, intentionally left
        // unimplemented: there is no per-wheel distance primitive.
        Command::SetSpeedForDistance { .. } => {
            Err(ExecutorError::Unsupported(command.describe()))
        }
        Command::SetSpeedForDegrees {
            speed1,
            speed2,
            degrees,
        } => {
            let wait = degrees_to_wait_ms(command, speed1, speed2, degrees)?;
            Ok(plain(speed1, speed2, wait))
        }
        Command::MoveForwardForTime { speed, ms } => {
            let ms = require_non_negative(command, ms, "duration")?;
            Ok(plain(speed, speed, ms))
        }
        Command::MoveForwardForDistance { speed, mm } => {
            let wait = distance_to_wait_ms(command, speed, mm)?;
            Ok(plain(speed, speed, wait))
        }
        Command::MoveBackwardForTime { speed, ms } => {
            let ms = require_non_negative(command, ms, "duration")?;
            let back = negated(command, speed)?;
            Ok(plain(back, back, ms))
        }
        Command::MoveBackwardForDistance { speed, mm } => {
            let wait = distance_to_wait_ms(command, speed, mm)?;
            let back = negated(command, speed)?;
            Ok(plain(back, back, wait))
        }
        Command::RotateLeftForTime { speed, ms } => {
            let ms = require_non_negative(command, ms, "duration")?;
            Ok(plain(negated(command, speed)?, speed, ms))
        }
        Command::RotateLeftForDegrees { speed, degrees } => {
            let left = negated(command, speed)?;
            let wait = degrees_to_wait_ms(command, left, speed, degrees)?;
            Ok(plain(left, speed, wait))
        }
        Command::RotateRightForTime { speed, ms } => {
            let ms = require_non_negative(command, ms, "duration")?;
            Ok(plain(speed, negated(command, speed)?, ms))
        }
        Command::RotateRightForDegrees { speed, degrees } => {
            let right = negated(command, speed)?;
            let wait = degrees_to_wait_ms(command, speed, right, degrees)?;
            Ok(plain(speed, right, wait))
        }
        Command::Stop => Ok(Translated {
            speed1: 0,
            speed2: 0,
            wait_ms: 0.0,
            reset_mode: true,
        }),
    }
}

/// Overall health decoded from one status-register read.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthReport {
    pub ok: bool,
    pub message: String,
    pub flags: StatusFlags,
}

impl HealthReport {
    fn from_flags(flags: StatusFlags) -> Self {
        let mut clauses = Vec::new();
        if flags.under_voltage {
            clauses.push("battery voltage low");
        }
        if flags.over_voltage {
            clauses.push("battery voltage high");
        }
        if flags.motor1_trip {
            clauses.push("motor 1 tripped");
        }
        if flags.motor2_trip {
            clauses.push("motor 2 tripped");
        }
        if flags.motor1_short {
            clauses.push("motor 1 short circuit");
        }
        if flags.motor2_short {
            clauses.push("motor 2 short circuit");
        }

        let ok = clauses.is_empty();
        let message = if ok {
            "all systems nominal".to_string()
        } else {
            clauses.join("; ")
        };
        Self { ok, message, flags }
    }
}

/// Sequential motion executor over one transport.
pub struct MotionExecutor<T: Transport> {
    transport: T,
    queue: CommandQueue,
    config: ExecutorConfig,
    events: Option<Sender<StatusEvent>>,
}

impl<T: Transport> MotionExecutor<T> {
    pub fn new(transport: T, queue: CommandQueue, config: ExecutorConfig) -> Result<Self> {
        if !(config.sim_speed_factor > 0.0) {
            return Err(ExecutorError::InvalidSpeedFactor(config.sim_speed_factor));
        }
        Ok(Self {
            transport,
            queue,
            config,
            events: None,
        })
    }

    /// Register an observer channel. Events arrive in protocol order:
    /// TxStarted, then TxDone or TxFailed, per send (mirrored for reads).
    pub fn set_event_sender(&mut self, sender: Sender<StatusEvent>) {
        self.events = Some(sender);
    }

    fn emit(&self, event: StatusEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }

    fn send_frames(&mut self, bytes: &[u8]) -> Result<()> {
        self.emit(StatusEvent::TxStarted {
            bytes: bytes.to_vec(),
        });
        match self.transport.send(bytes, self.config.send_timeout_ms) {
            Ok(()) => {
                self.emit(StatusEvent::TxDone { len: bytes.len() });
                Ok(())
            }
            Err(e) => {
                self.emit(StatusEvent::TxFailed {
                    reason: e.to_string(),
                });
                Err(ProtocolError::from(e).into())
            }
        }
    }

    fn read_register(&mut self, register: ReadRegister) -> Result<Vec<u8>> {
        self.emit(StatusEvent::RxStarted {
            register: register as u8,
            expected: register.response_len(),
        });
        match protocol::read_register(&mut self.transport, register, self.config.receive_timeout_ms)
        {
            Ok(bytes) => {
                self.emit(StatusEvent::RxDone {
                    bytes: bytes.clone(),
                });
                Ok(bytes)
            }
            Err(e) => {
                self.emit(StatusEvent::RxFailed {
                    reason: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Run one command end to end: translate, encode, send, wait.
    fn execute(&mut self, command: &Command) -> Result<()> {
        let translated = translate(command)?;

        let frames = if translated.reset_mode {
            protocol::stop_all()
        } else {
            protocol::set_speeds(translated.speed1, translated.speed2)
        };
        self.send_frames(&frames)?;

        if translated.wait_ms > 0.0 {
            let scaled_ms = translated.wait_ms / self.config.sim_speed_factor;
            debug!("Holding speeds for {:.1} ms", scaled_ms);
            thread::sleep(Duration::from_secs_f64(scaled_ms / 1000.0));
        }

        self.emit(StatusEvent::CommandDone {
            description: command.describe(),
        });
        Ok(())
    }

    /// Drain the queue until it is empty, executing commands in order.
    ///
    /// A command that fails translation is skipped before any I/O and the
    /// drain continues; a transport or protocol failure is fatal and ends
    /// the drain with the error. Returns the number of commands run.
    pub fn run(&mut self) -> Result<usize> {
        let mut commands_run = 0;

        while let Some(command) = self.queue.pop() {
            debug!("Executing: {}", command.describe());
            match self.execute(&command) {
                Ok(()) => commands_run += 1,
                Err(e @ ExecutorError::InvalidParameter { .. })
                | Err(e @ ExecutorError::Unsupported(..)) => {
                    warn!("Skipping command: {}", e);
                }
                Err(e) => {
                    warn!("Drain halted: {}", e);
                    return Err(e);
                }
            }
        }

        self.emit(StatusEvent::DrainComplete { commands_run });
        info!("Drain complete, {} commands run", commands_run);
        Ok(commands_run)
    }

    /// Spawn the drain on its own thread, consuming the executor.
    pub fn spawn(mut self) -> JoinHandle<Result<usize>>
    where
        T: Send + 'static,
    {
        thread::spawn(move || self.run())
    }

    /// Put the controller into the state the executor assumes: signed
    /// drive mode, encoders zeroed, serial watchdog enabled.
    ///
    /// Call once before the first drain.
    pub fn initialize(&mut self) -> Result<()> {
        info!("Initializing controller for signed drive mode");
        self.send_frames(&protocol::set_mode(protocol::Mode::Signed))?;
        self.send_frames(&protocol::reset_encoders())?;
        self.send_frames(&protocol::enable_timeout())?;
        Ok(())
    }

    /// Read the status register and fold the six fault flags into a
    /// report. Faults are reported, never raised as errors.
    pub fn check_health(&mut self) -> Result<HealthReport> {
        let bytes = self.read_register(ReadRegister::Status)?;
        let flags = StatusFlags::from_byte(bytes[0]);
        let report = HealthReport::from_flags(flags);
        if !report.ok {
            warn!("Controller fault: {}", report.message);
        }
        Ok(report)
    }

    /// Read both wheel encoders in one transaction.
    pub fn read_encoders(&mut self) -> Result<(i32, i32)> {
        let bytes = self.read_register(ReadRegister::Encoders)?;
        Ok(protocol::decode_encoders(&bytes))
    }

    /// Access the underlying transport, e.g. to inspect a simulated link.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
