//! End-to-end console sessions driven through the command slot.
//!
//! Each test wires a [`Session`] to a recording sink and a real
//! population engine, then submits lines the way a host loop would.

#![allow(clippy::unwrap_used)]

use cadence_console::dispatch::{ConsoleState, DispatchOutcome, NOT_FOUND_MESSAGE};
use cadence_console::error::{CommandError, SessionError, SlotError};
use cadence_console::io::RecordingSink;
use cadence_console::session::{Session, SessionOptions};
use cadence_console::slot::SlotState;
use cadence_console::table::{CommandEntry, CommandStatus, CommandTable};
use cadence_core::simulation::{SharedSimulation, Simulation};
use cadence_sim::{PopulationEngine, PopulationParams};

fn start(table: CommandTable, options: &SessionOptions) -> (Session<PopulationEngine>, RecordingSink) {
    let sink = RecordingSink::new();
    let simulation = SharedSimulation::new(PopulationEngine::new(PopulationParams::default()));
    let session = Session::with_seed(options, table, simulation, Box::new(sink.clone()), 7);
    // Drop the banner.
    let _ = sink.take();
    (session, sink)
}

fn population_table(simulation: &SharedSimulation<PopulationEngine>) -> CommandTable {
    let sim = simulation.clone();
    CommandTable::new([CommandEntry::new(
        "count",
        "",
        "Prints the population",
        move |ctx, _inv| {
            let population = sim.population_count();
            ctx.write_line(&format!("{population}"));
            Ok(CommandStatus::Continue)
        },
    )])
}

#[test]
fn a_full_session_from_help_to_quit() {
    let (mut session, sink) = start(CommandTable::standard(), &SessionOptions::default());

    assert_eq!(session.submit_line("help\n").unwrap(), DispatchOutcome::Continue);
    let help = sink.take();
    assert_eq!(help.len(), 5);
    assert_eq!(help.first().map(String::as_str), Some("Commands:"));
    assert!(help.iter().skip(1).any(|line| line.starts_with("quit")));

    assert_eq!(session.submit_line("help quit").unwrap(), DispatchOutcome::Continue);
    assert_eq!(sink.take(), vec![format!("{:<28}Quits the console", "quit")]);

    assert_eq!(session.submit_line("frobnicate").unwrap(), DispatchOutcome::NotFound);
    assert_eq!(sink.take(), vec![format!("ERROR: {NOT_FOUND_MESSAGE}")]);
    assert!(session.should_continue());

    assert_eq!(session.submit_line("close\r\n").unwrap(), DispatchOutcome::Quit);
    assert!(!session.should_continue());
    assert_eq!(session.state(), ConsoleState::Terminated);

    assert!(matches!(session.submit_line("help"), Err(SessionError::Terminated)));
    assert!(sink.lines().is_empty());
    session.shutdown();
}

#[test]
fn no_command_text_survives_a_cycle() {
    let (mut session, _sink) = start(CommandTable::standard(), &SessionOptions::default());
    for line in ["help", "nonsense words here", "", "help nothing"] {
        let _ = session.submit_line(line).unwrap();
        assert_eq!(session.slot().state(), SlotState::Empty);
        assert!(session.slot().is_erased());
    }
}

#[test]
fn rejected_submission_keeps_the_session_alive() {
    let options = SessionOptions {
        max_line_length: 6,
        ..SessionOptions::default()
    };
    let (mut session, sink) = start(CommandTable::standard(), &options);

    let err = session.submit_line("help quit").unwrap_err();
    assert!(matches!(
        err,
        SessionError::Slot {
            source: SlotError::Overflow { len: 9, capacity: 6 }
        }
    ));
    assert!(sink.lines().is_empty());
    assert_eq!(session.slot().state(), SlotState::Empty);
    assert_eq!(session.submit_line("quit").unwrap(), DispatchOutcome::Quit);
}

#[test]
fn handlers_see_the_shared_simulation() {
    let simulation = SharedSimulation::new(PopulationEngine::new(PopulationParams::default()));
    let table = population_table(&simulation);
    let sink = RecordingSink::new();
    let mut session = Session::with_seed(
        &SessionOptions::default(),
        table,
        simulation.clone(),
        Box::new(sink.clone()),
        11,
    );
    let _ = sink.take();

    assert_eq!(session.submit_line("count").unwrap(), DispatchOutcome::Continue);
    assert_eq!(sink.take(), vec!["32"]);

    simulation.with(PopulationEngine::close);
    assert_eq!(session.submit_line("count").unwrap(), DispatchOutcome::Continue);
    assert_eq!(sink.take(), vec!["0"]);
}

#[test]
fn handler_errors_are_printed_not_fatal() {
    let table = CommandTable::new([CommandEntry::new("boom", "", "Fails", |_ctx, _inv| {
        Err(CommandError::failed("engine unavailable"))
    })]);
    let (mut session, sink) = start(table, &SessionOptions::default());

    assert_eq!(
        session.submit_line("boom").unwrap(),
        DispatchOutcome::ExecutionError("engine unavailable".to_owned())
    );
    assert_eq!(sink.take(), vec!["ERROR: engine unavailable"]);
    assert!(session.should_continue());
    assert_eq!(session.slot().state(), SlotState::Empty);
}
