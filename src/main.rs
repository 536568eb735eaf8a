//! Headless chainpop runner (default binary).
//!
//! Hosts the match-chain engine behind the TCP adapter so external agents
//! can drive complete runs. `chainpop observe` connects to a running
//! instance as a read-only observer instead.

use std::time::{Duration, Instant};

use anyhow::Result;

use chainpop::adapter::protocol::{create_ack, create_error, ErrorCode, LastResolution};
use chainpop::adapter::{
    build_observation, Adapter, ClientCommand, InboundCommand, InboundPayload, OutboundMessage,
};
use chainpop::core::{GameOptions, GameSnapshot, GameState, Selection};
use chainpop::observe::{
    connect_observer, observe_status_lines, parse_observe_args, snapshot_from_observation,
    wait_for_welcome, ObserveConfig, ObserveEvent,
};
use chainpop::types::{GameOp, GamePhase, GridPos};

const POLL_MS: u64 = 5;
/// Idle observers still get an observation at this cadence
const KEEPALIVE_MS: u64 = 1000;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(config) = parse_observe_args(&args)? {
        return run_observe(&config);
    }

    run()
}

fn run() -> Result<()> {
    let (seed, options) = options_from_env();

    let Some(mut adapter) = Adapter::start_from_env() else {
        println!("[Runner] adapter disabled, nothing to serve");
        return Ok(());
    };

    println!(
        "[Runner] chainpop {}x{} seed {} endless {}",
        options.rows, options.cols, seed, options.endless
    );

    let mut game_state = GameState::with_options(seed, options);
    let mut snapshot = GameSnapshot::default();
    let mut obs_seq: u64 = 0;
    let mut last_sent = Instant::now();

    loop {
        let mut handled = false;
        while let Some(cmd) = adapter.try_recv() {
            handle_command(&mut game_state, &mut snapshot, &adapter, &mut obs_seq, cmd);
            handled = true;
        }
        if handled {
            last_sent = Instant::now();
        } else if last_sent.elapsed() >= Duration::from_millis(KEEPALIVE_MS) {
            broadcast_state(&mut game_state, &mut snapshot, &adapter, &mut obs_seq);
            last_sent = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(POLL_MS));
    }
}

fn handle_command(
    game_state: &mut GameState,
    snapshot: &mut GameSnapshot,
    adapter: &Adapter,
    obs_seq: &mut u64,
    cmd: InboundCommand,
) {
    match cmd.payload {
        InboundPayload::SnapshotRequest => {
            game_state.snapshot_into(snapshot);
            *obs_seq += 1;
            let obs = build_observation(snapshot, *obs_seq, None);
            adapter.send(OutboundMessage::ToClientObservation {
                client_id: cmd.client_id,
                obs,
            });
        }
        InboundPayload::Command(ClientCommand::Ops(ops)) => {
            // Rejected ops are no-ops; the observation shows what stuck.
            for op in ops {
                game_state.apply_op(op);
            }
            adapter.send(OutboundMessage::ToClientAck {
                client_id: cmd.client_id,
                ack: create_ack(cmd.seq, cmd.seq),
            });
            broadcast_state(game_state, snapshot, adapter, obs_seq);
        }
        InboundPayload::Command(ClientCommand::Chain(cells)) => {
            if !chain_is_applicable(game_state, &cells) {
                adapter.send(OutboundMessage::ToClientError {
                    client_id: cmd.client_id,
                    err: create_error(
                        cmd.seq,
                        ErrorCode::InvalidChain,
                        "Chain does not apply to the current board",
                    ),
                });
                return;
            }
            apply_chain(game_state, &cells);
            adapter.send(OutboundMessage::ToClientAck {
                client_id: cmd.client_id,
                ack: create_ack(cmd.seq, cmd.seq),
            });
            broadcast_state(game_state, snapshot, adapter, obs_seq);
        }
    }
}

/// A chain applies only when every step would be accepted; probing with a
/// scratch selection keeps rejected chains from touching the game.
fn chain_is_applicable(game_state: &GameState, cells: &[GridPos]) -> bool {
    let Some((&first, rest)) = cells.split_first() else {
        return false;
    };
    if game_state.phase() != GamePhase::Playing || !game_state.selection_path().is_empty() {
        return false;
    }

    let mut probe = Selection::new();
    if !probe.start(game_state.grid(), first) {
        return false;
    }
    for &cell in rest {
        if !probe.extend(game_state.grid(), cell) {
            return false;
        }
    }
    true
}

fn apply_chain(game_state: &mut GameState, cells: &[GridPos]) {
    let Some((&first, rest)) = cells.split_first() else {
        return;
    };
    game_state.apply_op(GameOp::StartSelection {
        row: first.row,
        col: first.col,
    });
    for &cell in rest {
        game_state.apply_op(GameOp::ExtendSelection {
            row: cell.row,
            col: cell.col,
        });
    }
    game_state.apply_op(GameOp::CommitSelection);
}

fn broadcast_state(
    game_state: &mut GameState,
    snapshot: &mut GameSnapshot,
    adapter: &Adapter,
    obs_seq: &mut u64,
) {
    let last = game_state.take_last_resolution().map(LastResolution::from);
    game_state.snapshot_into(snapshot);
    *obs_seq += 1;
    let obs = build_observation(snapshot, *obs_seq, last);
    adapter.send(OutboundMessage::BroadcastObservation { obs });
}

fn options_from_env() -> (u32, GameOptions) {
    use std::env;

    let seed = env::var("CHAINPOP_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    let mut options = GameOptions::default();
    if let Some(rows) = env::var("CHAINPOP_ROWS").ok().and_then(|s| s.parse().ok()) {
        options.rows = rows;
    }
    if let Some(cols) = env::var("CHAINPOP_COLS").ok().and_then(|s| s.parse().ok()) {
        options.cols = cols;
    }
    if let Ok(endless) = env::var("CHAINPOP_ENDLESS") {
        options.endless = endless == "1" || endless.to_lowercase() == "true";
    }

    (seed, options)
}

fn run_observe(config: &ObserveConfig) -> Result<()> {
    let rx = connect_observer(config)?;
    let first = wait_for_welcome(&rx, Duration::from_secs(5))?;

    let mut snap = first.as_ref().map(snapshot_from_observation);
    print_status(config, snap.as_ref());

    loop {
        match rx.recv() {
            Ok(ObserveEvent::Observation(obs)) => {
                snap = Some(snapshot_from_observation(&obs));
                print_status(config, snap.as_ref());
            }
            Ok(ObserveEvent::Welcome) => {}
            Ok(ObserveEvent::Error(msg)) => eprintln!("[Observe] {}", msg),
            Ok(ObserveEvent::Closed) | Err(_) => {
                println!("[Observe] connection closed");
                return Ok(());
            }
        }
    }
}

fn print_status(config: &ObserveConfig, snap: Option<&GameSnapshot>) {
    for line in observe_status_lines(config, snap) {
        println!("{}", line);
    }
    println!();
}
