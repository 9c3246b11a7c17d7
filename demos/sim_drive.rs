// Drive the simulated base through a command script and watch the pose.
//
// Usage: cargo run --example sim_drive -- [commands.json]
//
// The optional JSON file holds an array of commands, e.g.
//   [{"type":"MoveForwardForTime","payload":{"speed":20,"ms":2000.0}},
//    {"type":"Stop"}]
// Without a file a built-in route is used.

use diffdrive_runtime::motor::Command;
use diffdrive_runtime::sim::{Obstacle, Rect, SimLink};
use diffdrive_runtime::{CommandQueue, ExecutorConfig, MotionExecutor};

/// Nominal duration of a command as scripted, for stepping sim time.
fn nominal_ms(command: &Command) -> f64 {
    match *command {
        Command::SetSpeedForTime { ms, .. }
        | Command::MoveForwardForTime { ms, .. }
        | Command::MoveBackwardForTime { ms, .. }
        | Command::RotateLeftForTime { ms, .. }
        | Command::RotateRightForTime { ms, .. } => ms,
        // Derived durations are close enough for display stepping
        Command::MoveForwardForDistance { speed, mm }
        | Command::MoveBackwardForDistance { speed, mm } => {
            mm / (6.25 * (speed as f64).abs()) * 1000.0
        }
        _ => 1000.0,
    }
}

fn scripted_route() -> Vec<Command> {
    vec![
        Command::MoveForwardForTime {
            speed: 20,
            ms: 2000.0,
        },
        Command::RotateLeftForTime {
            speed: 10,
            ms: 1000.0,
        },
        Command::MoveForwardForDistance {
            speed: 20,
            mm: 500.0,
        },
        Command::Stop,
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let commands = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str::<Vec<Command>>(&json)?
        }
        None => scripted_route(),
    };

    // Arena walls plus a pillar in the robot's path
    let link = SimLink::with_obstacles(vec![
        Obstacle::RectangleBorder {
            rect: Rect::new(-3000.0, -3000.0, 6000.0, 6000.0),
            border_width: 10.0,
        },
        Obstacle::RectangleFilled {
            rect: Rect::new(1500.0, -200.0, 200.0, 400.0),
        },
    ]);

    let queue = CommandQueue::new();
    // Large pacing factor so the demo does not sleep in real time
    let config = ExecutorConfig {
        sim_speed_factor: 1000.0,
        ..ExecutorConfig::default()
    };
    let mut executor = MotionExecutor::new(link, queue.clone(), config)?;
    executor.initialize()?;

    println!("Start pose: {:?}", executor.transport_mut().pose());

    for command in commands {
        let ms = nominal_ms(&command);
        println!("> {}", command.describe());
        queue.push(command);
        executor.run()?;
        executor.transport_mut().advance(ms / 1000.0);

        let link = executor.transport_mut();
        println!("  pose: {:?}", link.pose());
        if let Some(index) = link.collided_with() {
            println!("  collided with obstacle {index}, wheels frozen");
            break;
        }
    }

    Ok(())
}
