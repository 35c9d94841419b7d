//! Simulation commands registered alongside the console built-ins.
//!
//! Every command locks the shared simulation for the duration of its
//! body, so it serializes with the tick worker.

use cadence_console::error::CommandError;
use cadence_console::table::{CommandContext, CommandEntry, CommandResult, CommandStatus, Invocation};
use cadence_core::simulation::{ReinitKind, SharedSimulation, Simulation};
use cadence_sim::{ColonySnapshot, PopulationEngine};
use rand::Rng;
use tracing::info;

/// Most ticks a single `step` may advance.
pub const MAX_STEP_TICKS: u64 = 65_536;

/// `status`, `reset`, `step` and its `run` alias, bound to `simulation`.
pub fn simulation_commands(
    simulation: &SharedSimulation<PopulationEngine>,
    map_area: u64,
) -> Vec<CommandEntry> {
    let status_sim = simulation.clone();
    let reset_sim = simulation.clone();
    let step_sim = simulation.clone();
    let run_sim = simulation.clone();

    vec![
        CommandEntry::new(
            "status",
            "",
            "Shows the population and run progress",
            move |ctx, _invocation| {
                let snap = status_sim.lock().snapshot();
                ctx.write_line(&status_line(&snap));
                Ok(CommandStatus::Continue)
            },
        ),
        CommandEntry::new(
            "reset",
            "[(seed)]",
            "Restarts the simulation",
            move |ctx, invocation| {
                let seed = match invocation.first_arg() {
                    Some(arg) => arg
                        .parse::<u64>()
                        .map_err(|_err| CommandError::failed(format!("Invalid seed '{arg}'")))?,
                    None => rand::rng().random(),
                };
                reset_sim.with(|sim| sim.reinitialize(ReinitKind::Reset, seed, map_area, 0));
                info!(seed, map_area, "simulation reset from console");
                ctx.write_line(&format!("Simulation reset (seed {seed})"));
                Ok(CommandStatus::Continue)
            },
        ),
        CommandEntry::new(
            "step",
            "[(ticks)]",
            "Advances the simulation, 1 tick by default",
            move |ctx, invocation| step_command(&step_sim, ctx, invocation),
        ),
        CommandEntry::new("run", "(ticks)", "", move |ctx, invocation| {
            step_command(&run_sim, ctx, invocation)
        }),
    ]
}

/// Advance up to `ticks` under one lock, stopping early if the colony dies
/// out, then print the status line.
fn step_command(
    simulation: &SharedSimulation<PopulationEngine>,
    ctx: &mut CommandContext<'_>,
    invocation: &Invocation<'_>,
) -> CommandResult {
    let ticks = match invocation.first_arg() {
        None => 1,
        Some(arg) => arg
            .parse::<u64>()
            .ok()
            .filter(|n| (1..=MAX_STEP_TICKS).contains(n))
            .ok_or_else(|| {
                CommandError::failed(format!(
                    "Invalid tick count '{arg}', expected 1 to {MAX_STEP_TICKS}"
                ))
            })?,
    };

    let snap = simulation.with(|sim| {
        for _ in 0..ticks {
            if sim.population_count() == 0 {
                break;
            }
            sim.advance_tick();
        }
        sim.snapshot()
    });
    info!(ticks, population = snap.population, "simulation stepped from console");
    ctx.write_line(&status_line(&snap));
    Ok(CommandStatus::Continue)
}

fn status_line(snap: &ColonySnapshot) -> String {
    format!(
        "Run {}: tick {}, population {} of {} (seed {})",
        snap.runs, snap.ticks_in_run, snap.population, snap.capacity, snap.seed
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cadence_console::dispatch::{Console, DispatchOutcome};
    use cadence_console::io::RecordingSink;
    use cadence_console::table::CommandTable;
    use cadence_sim::PopulationParams;

    use super::*;

    const AREA: u64 = 1 << 18;

    fn console() -> (Console, SharedSimulation<PopulationEngine>) {
        let sim = SharedSimulation::new(PopulationEngine::new(PopulationParams::default()));
        sim.with(|s| s.reinitialize(ReinitKind::StartUp, 1, AREA, 0));
        let table = CommandTable::new(simulation_commands(&sim, AREA));
        (Console::new(table), sim)
    }

    #[test]
    fn commands_follow_the_builtins() {
        let (console, _sim) = console();
        let names: Vec<&str> = console.table().entries().iter().map(CommandEntry::name).collect();
        assert_eq!(
            names,
            ["help", "quit", "exit", "close", "status", "reset", "step", "run"]
        );
    }

    #[test]
    fn status_reports_the_snapshot() {
        let (mut console, _sim) = console();
        let mut sink = RecordingSink::new();
        assert_eq!(console.dispatch("status", &mut sink), DispatchOutcome::Continue);
        assert_eq!(
            sink.lines(),
            vec!["Run 1: tick 0, population 32 of 256 (seed 1)"]
        );
    }

    #[test]
    fn reset_with_seed_reinitializes() {
        let (mut console, sim) = console();
        let mut sink = RecordingSink::new();
        assert_eq!(console.dispatch("reset 77", &mut sink), DispatchOutcome::Continue);
        let snap = sim.lock().snapshot();
        assert_eq!(snap.seed, 77);
        assert_eq!(snap.runs, 2);
        assert_eq!(snap.kind, Some(ReinitKind::Reset));
        assert_eq!(sink.lines(), vec!["Simulation reset (seed 77)"]);
    }

    #[test]
    fn reset_with_bad_seed_is_an_execution_error() {
        let (mut console, sim) = console();
        let mut sink = RecordingSink::new();
        assert_eq!(
            console.dispatch("reset banana", &mut sink),
            DispatchOutcome::ExecutionError("Invalid seed 'banana'".to_owned())
        );
        assert_eq!(sim.lock().snapshot().runs, 1);
    }

    #[test]
    fn step_advances_the_shared_engine() {
        let (mut console, sim) = console();
        let mut sink = RecordingSink::new();
        assert_eq!(console.dispatch("step", &mut sink), DispatchOutcome::Continue);
        assert_eq!(sim.lock().snapshot().ticks_in_run, 1);

        assert_eq!(console.dispatch("run 9", &mut sink), DispatchOutcome::Continue);
        let snap = sim.lock().snapshot();
        assert_eq!(snap.ticks_in_run, 10);
        assert_eq!(sink.take().last(), Some(&status_line(&snap)));
    }

    #[test]
    fn step_stops_when_the_colony_dies_out() {
        let sim = SharedSimulation::new(PopulationEngine::new(PopulationParams::new(4, 0.0, 1.0)));
        sim.with(|s| s.reinitialize(ReinitKind::StartUp, 1, AREA, 0));
        let mut console = Console::new(CommandTable::new(simulation_commands(&sim, AREA)));
        let mut sink = RecordingSink::new();

        assert_eq!(console.dispatch("step 50", &mut sink), DispatchOutcome::Continue);
        let snap = sim.lock().snapshot();
        assert_eq!(snap.population, 0);
        assert_eq!(snap.ticks_in_run, 1);
    }

    #[test]
    fn step_rejects_bad_tick_counts() {
        let (mut console, sim) = console();
        let mut sink = RecordingSink::new();
        for line in ["step 0", "step lots", "step 65537"] {
            assert!(matches!(
                console.dispatch(line, &mut sink),
                DispatchOutcome::ExecutionError(_)
            ));
        }
        assert_eq!(sim.lock().snapshot().ticks_in_run, 0);
    }
}
