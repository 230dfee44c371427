mod simulation;

use clap::Parser;
use log::warn;

use simulation::{ControlInput, DrivingSession, TickOutcome};

#[derive(Parser)]
#[command(name = "drive_sim")]
#[command(about = "Headless driving simulation with violation tracking")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.05")]
    delta: f64,

    /// Seed for the traffic-light countdown randomness
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Replay the recorded run afterwards and compare the outcomes
    #[arg(long)]
    replay: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Running driving simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s, Seed: {}", cli.ticks, cli.delta, cli.seed);
    println!();

    let mut session = DrivingSession::create_test_session(cli.seed);

    let ticks_per_second = (1.0 / cli.delta).ceil() as u32;
    let mut tick = 0;
    while tick < cli.ticks && !session.finished {
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            let input = scripted_input(&session);
            if session.tick(cli.delta, 0.0, &input)? == TickOutcome::Finished {
                break;
            }
        }
        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f64 * cli.delta
        );
        session.print_summary();
        println!();
    }

    println!("=== Final State ===");
    session.print_summary();

    if cli.replay {
        println!();
        run_replay(&mut session)?;
    }
    Ok(())
}

/// A simple scripted driver: accelerate toward the active limit, stand
/// still for stop signs, shift by rpm.
fn scripted_input(session: &DrivingSession) -> ControlInput {
    let kmh = simulation::speed_to_kmh(session.car.speed);
    let rpm = session.car.engine.rpm();

    let target_kmh = 45.0;
    let mut input = ControlInput::default();
    if kmh < target_kmh {
        input.throttle = 0.6;
    } else {
        input.throttle = 0.1;
    }
    if rpm > 3000.0 && session.car.gearbox.gear() < simulation::MAX_GEAR {
        input.gear_change = 1;
    } else if rpm < 1200.0 && session.car.gearbox.gear() > 1 {
        input.gear_change = -1;
    }
    input
}

/// Replay the run just recorded and check the outcome matches.
fn run_replay(session: &mut DrivingSession) -> anyhow::Result<()> {
    let log = match session.log.clone() {
        Some(log) => log,
        None => {
            warn!("no run was recorded, skipping replay");
            return Ok(());
        }
    };
    let live_violations = session.violation_count();
    let live_liters = session.consumption_monitor.liters_used;

    println!("Replaying {} recorded ticks...", log.items.len());
    session.start_replay(log)?;
    while session.tick_replay()? == TickOutcome::Running {}

    println!("=== Replay State ===");
    session.print_summary();
    println!(
        "Replay match: violations {} -> {}, fuel {:.4} -> {:.4} L",
        live_violations,
        session.violation_count(),
        live_liters,
        session.consumption_monitor.liters_used
    );
    Ok(())
}
