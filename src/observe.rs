//! Observer client for a running adapter.
//!
//! Connects as a read-only observer, streams observations off a background
//! thread, and converts them back into core snapshots.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::adapter::protocol::{
    create_hello, CommandMode, ObservationMessage, PhaseLower, RequestedRole, PROTOCOL_VERSION,
};
use crate::core::GameSnapshot;
use crate::types::{GamePhase, GridPos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub enum ObserveEvent {
    Welcome,
    Observation(ObservationMessage),
    Error(String),
    Closed,
}

pub fn parse_observe_args(args: &[String]) -> Result<Option<ObserveConfig>> {
    if args.is_empty() || args[0] != "observe" {
        return Ok(None);
    }

    let mut host = String::from("127.0.0.1");
    let mut port: u16 = 7777;
    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --host"))?;
                host = v.clone();
            }
            "--port" => {
                i += 1;
                let v = args
                    .get(i)
                    .ok_or_else(|| anyhow!("observe: missing value for --port"))?;
                port = v
                    .parse::<u16>()
                    .map_err(|_| anyhow!("observe: invalid --port value: {}", v))?;
            }
            other => {
                return Err(anyhow!("observe: unknown argument: {}", other));
            }
        }
        i += 1;
    }

    Ok(Some(ObserveConfig { host, port }))
}

pub fn connect_observer(config: &ObserveConfig) -> Result<mpsc::Receiver<ObserveEvent>> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .map_err(|e| anyhow!("observe: connect {}:{} failed: {}", config.host, config.port, e))?;
    stream
        .set_nodelay(true)
        .map_err(|e| anyhow!("observe: set_nodelay failed: {}", e))?;

    let mut hello = create_hello(1, "chainpop-observe", PROTOCOL_VERSION);
    hello.requested.stream_observations = true;
    hello.requested.command_mode = CommandMode::Op;
    hello.requested.role = Some(RequestedRole::Observer);
    let line = serde_json::to_string(&hello)?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let (tx, rx) = mpsc::channel::<ObserveEvent>();
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = tx.send(ObserveEvent::Error(format!("observe: read error: {}", e)));
                    let _ = tx.send(ObserveEvent::Closed);
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            if let Some(event) = parse_server_line(&line) {
                let _ = tx.send(event);
            }
        }
        let _ = tx.send(ObserveEvent::Closed);
    });

    Ok(rx)
}

pub fn observe_status_lines(
    config: &ObserveConfig,
    snap: Option<&GameSnapshot>,
) -> [String; 5] {
    let (state, run, targets) = match snap {
        Some(s) => {
            let state = match s.phase {
                GamePhase::Home => "HOME",
                GamePhase::Playing => "PLAY",
                GamePhase::LevelUp => "LEVELUP",
                GamePhase::Won => "WON",
                GamePhase::Lost => "LOST",
            };
            let run = format!(
                "LEVEL {} MOVES {}/{} SCORE {}",
                s.level_index, s.moves_remaining, s.move_budget, s.score
            );
            let targets = format!(
                "EP {} COMMIT {} TARGETS {} {} {} {} {}",
                s.episode_id,
                s.commit_id,
                s.targets[0],
                s.targets[1],
                s.targets[2],
                s.targets[3],
                s.targets[4],
            );
            (state.to_string(), run, targets)
        }
        None => (
            "WAITING".to_string(),
            "LEVEL - MOVES -/- SCORE -".to_string(),
            "EP - COMMIT - TARGETS -".to_string(),
        ),
    };

    [
        "MODE OBSERVE".to_string(),
        format!("TARGET {}:{}", config.host, config.port),
        format!("STATE {}", state),
        run,
        targets,
    ]
}

pub fn snapshot_from_observation(obs: &ObservationMessage) -> GameSnapshot {
    let faces: Vec<u8> = obs.board.faces.iter().flatten().copied().collect();
    let powerups: Vec<u8> = obs.board.powerups.iter().flatten().copied().collect();

    let selection: Vec<GridPos> = obs
        .selection
        .iter()
        .map(|c| GridPos::new(c.row, c.col))
        .collect();

    GameSnapshot {
        phase: phase_from_lower(obs.phase),
        rows: obs.board.rows,
        cols: obs.board.cols,
        faces,
        powerups,
        selection,
        score: obs.score,
        level_index: obs.level,
        moves_remaining: obs.moves_remaining,
        move_budget: obs.move_budget,
        targets: [
            obs.targets.red,
            obs.targets.blue,
            obs.targets.yellow,
            obs.targets.green,
            obs.targets.purple,
        ],
        combo_meter: obs.combo_meter,
        combo_streak: obs.combo_streak,
        multiplier_turns: obs.multiplier_turns,
        episode_id: obs.episode_id,
        commit_id: obs.commit_id,
    }
}

fn phase_from_lower(value: PhaseLower) -> GamePhase {
    match value {
        PhaseLower::Home => GamePhase::Home,
        PhaseLower::Playing => GamePhase::Playing,
        PhaseLower::LevelUp => GamePhase::LevelUp,
        PhaseLower::Won => GamePhase::Won,
        PhaseLower::Lost => GamePhase::Lost,
    }
}

pub fn wait_for_welcome(
    rx: &mpsc::Receiver<ObserveEvent>,
    timeout: Duration,
) -> Result<Option<ObservationMessage>> {
    let deadline = std::time::Instant::now() + timeout;
    let mut got_welcome = false;
    let mut first_obs: Option<ObservationMessage> = None;

    while std::time::Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(ObserveEvent::Welcome) => {
                got_welcome = true;
                if first_obs.is_some() {
                    break;
                }
            }
            Ok(ObserveEvent::Observation(obs)) => {
                first_obs = Some(obs);
                if got_welcome {
                    break;
                }
            }
            Ok(ObserveEvent::Error(msg)) => return Err(anyhow!(msg)),
            Ok(ObserveEvent::Closed) => return Err(anyhow!("observe: connection closed")),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow!("observe: event channel disconnected"));
            }
        }
    }

    if !got_welcome {
        return Err(anyhow!("observe: did not receive welcome"));
    }
    Ok(first_obs)
}

fn parse_server_line(line: &str) -> Option<ObserveEvent> {
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(ObserveEvent::Error(format!("observe: invalid json: {}", e))),
    };
    let msg_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
    match msg_type {
        "welcome" => Some(ObserveEvent::Welcome),
        "observation" => match serde_json::from_str::<ObservationMessage>(line) {
            Ok(obs) => Some(ObserveEvent::Observation(obs)),
            Err(e) => Some(ObserveEvent::Error(format!(
                "observe: invalid observation: {}",
                e
            ))),
        },
        "error" => {
            let code = value.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
            let msg = value.get("message").and_then(|v| v.as_str()).unwrap_or("");
            Some(ObserveEvent::Error(format!(
                "observe: server error {} {}",
                code, msg
            )))
        }
        _ => None,
    }
}
