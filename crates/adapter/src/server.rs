//! TCP server for AI adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::core::GameSnapshot;
use crate::protocol::*;
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
use crate::types::{GameOp, GridPos};

use arrayvec::ArrayVec;

/// Stable 64-bit FNV-1a hasher for deterministic `state_hash`.
///
/// We avoid `DefaultHasher` here since its output is not guaranteed stable across
/// Rust versions/platforms.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let mut end = 0usize;
    for b in rest.as_bytes() {
        if b.is_ascii_digit() {
            end += 1;
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl std::hash::Hasher for Fnv1aHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 10,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let host = env::var("CHAINPOP_AI_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("CHAINPOP_AI_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7777);

        let max_pending_commands = env::var("CHAINPOP_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let log_path = env::var("CHAINPOP_AI_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            host,
            port,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands,
            log_path,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: Arc<RwLock<Vec<ClientHandle>>>,
    controller: Arc<RwLock<Option<usize>>>, // Index into clients vec
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: Arc::new(RwLock::new(Vec::new())),
            controller: Arc::new(RwLock::new(None)),
        }
    }

    /// Check if AI is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("CHAINPOP_AI_DISABLED")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    }
}

async fn is_handshaken(state: &Arc<ServerState>, client_id: usize) -> bool {
    let clients = state.clients.read().await;
    clients
        .iter()
        .find(|c| c.id == client_id)
        .map(|c| c.handshaken)
        .unwrap_or(false)
}

async fn check_and_update_seq(state: &Arc<ServerState>, client_id: usize, seq: u64) -> bool {
    let mut clients = state.clients.write().await;
    let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
        return true;
    };

    match client.last_seq {
        None => {
            client.last_seq = Some(seq);
            true
        }
        Some(prev) => {
            if seq <= prev {
                false
            } else {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub is_controller: bool,
    pub wants_control: bool,
    pub command_mode: CommandMode,
    pub stream_observations: bool,
    pub handshaken: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>, // Channel to send messages to client
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Line(String),
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

#[derive(Debug, Clone)]
enum WireRecord {
    Bytes(Vec<u8>),
    Welcome(WelcomeMessage),
    Ack(AckMessage),
    Error(ErrorMessage),
    Observation(ObservationMessage),
}

/// Start the TCP server
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    if ServerState::is_disabled() {
        println!("[Adapter] AI control disabled via CHAINPOP_AI_DISABLED");
        // Just drain the command channel to prevent blocking
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
        }
    }

    let wire_log_tx: Option<mpsc::UnboundedSender<WireRecord>> = if let Some(path) = config.log_path.clone() {
        let (tx, mut rx) = mpsc::unbounded_channel::<WireRecord>();
        tokio::spawn(async move {
            use tokio::fs::OpenOptions;
            use tokio::io::AsyncWriteExt;

            let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(f) => f,
                Err(_) => return,
            };

            let mut buf: Vec<u8> = Vec::with_capacity(4096);

            while let Some(rec) = rx.recv().await {
                match rec {
                    WireRecord::Bytes(b) => {
                        if file.write_all(&b).await.is_err() {
                            break;
                        }
                    }
                    WireRecord::Welcome(v) => {
                        buf.clear();
                        if serde_json::to_writer(&mut buf, &v).is_err() {
                            continue;
                        }
                        if file.write_all(&buf).await.is_err() {
                            break;
                        }
                    }
                    WireRecord::Ack(v) => {
                        buf.clear();
                        if serde_json::to_writer(&mut buf, &v).is_err() {
                            continue;
                        }
                        if file.write_all(&buf).await.is_err() {
                            break;
                        }
                    }
                    WireRecord::Error(v) => {
                        buf.clear();
                        if serde_json::to_writer(&mut buf, &v).is_err() {
                            continue;
                        }
                        if file.write_all(&buf).await.is_err() {
                            break;
                        }
                    }
                    WireRecord::Observation(v) => {
                        buf.clear();
                        if serde_json::to_writer(&mut buf, &v).is_err() {
                            continue;
                        }
                        if file.write_all(&buf).await.is_err() {
                            break;
                        }
                    }
                }
                if file.write_all(b"\n").await.is_err() {
                    break;
                }
            }

            let _ = file.flush().await;
        });
        Some(tx)
    } else {
        None
    };

    let addr = config.socket_addr();
    let listener = TcpListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    println!("[Adapter] TCP server listening on {}", bound);
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));
    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Line(line));
                        }
                    }
                    OutboundMessage::Broadcast { line } => {
                        let clients = state.clients.read().await;
                        for c in clients.iter() {
                            if c.stream_observations {
                                let _ = c.tx.send(ClientOutbound::Line(line.clone()));
                            }
                        }
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs));
                        }
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        let clients = state.clients.read().await;
                        for c in clients.iter() {
                            if c.stream_observations {
                                let _ = c.tx.send(ClientOutbound::Observation(obs.clone()));
                            }
                        }
                    }
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Ack(ack));
                        }
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        let clients = state.clients.read().await;
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Error(err));
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        println!("[Adapter] Client {} connected from {}", client_id, addr);

        let state_clone = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        // Spawn task to handle this client
        tokio::spawn(async move {
            if let Err(e) =
                handle_client(socket, addr, client_id, state_clone, command_tx, wire_log_tx).await
            {
                eprintln!("[Adapter] Client {} error: {}", client_id, e);
            }
            println!("[Adapter] Client {} disconnected", client_id);
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<mpsc::UnboundedSender<WireRecord>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    // Add client to list
    let client_handle = ClientHandle {
        id: client_id,
        addr,
        is_controller: false,
        wants_control: true,
        command_mode: CommandMode::Op,
        stream_observations: false,
        handshaken: false,
        last_seq: None,
        tx: tx.clone(),
    };

    {
        let mut clients = state.clients.write().await;
        clients.push(client_handle);
    }

    let wire_log_tx_out = wire_log_tx.clone();

    // Spawn task to write messages to client
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            match msg {
                ClientOutbound::Line(line) => {
                    let bytes = line.into_bytes();
                    if writer.write_all(&bytes).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Bytes(bytes));
                    }
                }
                ClientOutbound::Ack(ack) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &ack).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Ack(ack));
                    }
                }
                ClientOutbound::Error(err) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &err).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Error(err));
                    }
                }
                ClientOutbound::Welcome(welcome) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &welcome).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Welcome(welcome));
                    }
                }
                ClientOutbound::Observation(obs) => {
                    buf.clear();
                    if serde_json::to_writer(&mut buf, &obs).is_err() {
                        continue;
                    }
                    if writer.write_all(&buf).await.is_err() {
                        break;
                    }
                    if let Some(tx) = wire_log_tx_out.as_ref() {
                        let _ = tx.send(WireRecord::Observation(obs));
                    }
                }
            }

            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages
    let mut line = String::new();

    loop {
        line.clear();
        // A read error is a disconnect too; break so cleanup below still
        // releases the controller slot.
        let bytes_read = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(_) => break,
        };

        if bytes_read == 0 {
            // Client disconnected
            break;
        }

        let raw_line = line.trim_end_matches(|c| c == '\n' || c == '\r');
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(tx) = wire_log_tx.as_ref() {
            let _ = tx.send(WireRecord::Bytes(raw_line.as_bytes().to_vec()));
        }

        // Parse the message
        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                // Sequencing: enforce monotonic seq per sender.
                if is_handshaken(&state, client_id).await
                    && !check_and_update_seq(&state, client_id, hello.seq).await
                {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Validate protocol version
                if !hello.protocol_version.starts_with("1.") {
                    let error = create_error(
                        hello.seq,
                        ErrorCode::ProtocolMismatch,
                        &format!("Protocol version {} not supported", hello.protocol_version),
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    break;
                }

                let wants_control = !matches!(hello.requested.role, Some(RequestedRole::Observer));

                // Mark client as handshaken and record its capabilities.
                // Controller assignment happens before the welcome reply so
                // the reply can carry the assigned role.
                let (role, controller_id) = {
                    let mut controller = state.controller.write().await;
                    let mut clients = state.clients.write().await;
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.command_mode = hello.requested.command_mode;
                        client.stream_observations = hello.requested.stream_observations;
                        client.wants_control = wants_control;
                    }

                    if controller.is_none() && wants_control {
                        *controller = Some(client_id);
                        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                            client.is_controller = true;
                        }
                        println!("[Adapter] Client {} is now controller", client_id);
                        (AssignedRole::Controller, Some(client_id as u64))
                    } else {
                        (AssignedRole::Observer, controller.map(|id| id as u64))
                    }
                };

                // Send welcome
                let welcome = create_welcome(
                    hello.seq,
                    &state.config.protocol_version,
                    client_id as u64,
                    role,
                    controller_id,
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                // Request an immediate snapshot for this client if desired.
                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                // Handshake required.
                let handshaken = is_handshaken(&state, client_id).await;
                if !handshaken {
                    let error =
                        create_error(
                            cmd.seq,
                            ErrorCode::HandshakeRequired,
                            "Send hello before command",
                        );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Sequencing: enforce monotonic seq per sender.
                if !check_and_update_seq(&state, client_id, cmd.seq).await {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Check if client is controller
                let is_controller = {
                    let clients = state.clients.read().await;
                    clients
                        .iter()
                        .find(|c| c.id == client_id)
                        .map(|c| c.is_controller)
                        .unwrap_or(false)
                };

                if !is_controller {
                    let error = create_error(
                        cmd.seq,
                        ErrorCode::NotController,
                        "Only controller may send commands",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }

                // Map command into an inbound command for the game loop.
                let mapped = match map_command(&cmd) {
                    Ok(c) => c,
                    Err((code, message)) => {
                        let error = create_error(cmd.seq, code, &message);
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }
                };

                // Backpressure: bounded queue.
                match command_tx.try_send(InboundCommand {
                    client_id,
                    seq: cmd.seq,
                    payload: InboundPayload::Command(mapped),
                }) {
                    Ok(()) => {
                        // Ack will be sent by the game loop after the command is applied.
                    }
                    Err(_) => {
                        let error = create_error(
                            cmd.seq,
                            ErrorCode::Backpressure,
                            "Command queue is full",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                    }
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => match ctrl.action {
                ControlAction::Claim => {
                    // Handshake required.
                    let handshaken = is_handshaken(&state, client_id).await;
                    if !handshaken {
                        let error = create_error(
                            ctrl.seq,
                            ErrorCode::HandshakeRequired,
                            "Send hello before control",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }

                    // Sequencing: enforce monotonic seq per sender.
                    if !check_and_update_seq(&state, client_id, ctrl.seq).await {
                        let error = create_error(
                            ctrl.seq,
                            ErrorCode::InvalidCommand,
                            "seq must be strictly increasing",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }

                    let mut controller = state.controller.write().await;
                    if controller.is_none() {
                        *controller = Some(client_id);
                        let mut clients = state.clients.write().await;
                        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                            client.is_controller = true;
                            client.wants_control = true;
                        }
                        let ack = create_ack(ctrl.seq, ctrl.seq);
                        let _ = tx.send(ClientOutbound::Ack(ack));
                    } else {
                        let error = create_error(
                            ctrl.seq,
                            ErrorCode::ControllerActive,
                            "Controller already assigned",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                    }
                }
                ControlAction::Release => {
                    // Handshake required.
                    let handshaken = is_handshaken(&state, client_id).await;
                    if !handshaken {
                        let error = create_error(
                            ctrl.seq,
                            ErrorCode::HandshakeRequired,
                            "Send hello before control",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }

                    // Sequencing: enforce monotonic seq per sender.
                    if !check_and_update_seq(&state, client_id, ctrl.seq).await {
                        let error = create_error(
                            ctrl.seq,
                            ErrorCode::InvalidCommand,
                            "seq must be strictly increasing",
                        );
                        let _ = tx.send(ClientOutbound::Error(error));
                        continue;
                    }

                    let mut controller = state.controller.write().await;
                    if *controller == Some(client_id) {
                        *controller = None;
                        let mut clients = state.clients.write().await;
                        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                            client.is_controller = false;
                        }
                        let ack = create_ack(ctrl.seq, ctrl.seq);
                        let _ = tx.send(ClientOutbound::Ack(ack));
                    } else {
                        let error =
                            create_error(
                                ctrl.seq,
                                ErrorCode::NotController,
                                "Only controller may release",
                            );
                        let _ = tx.send(ClientOutbound::Error(error));
                    }
                }
            },

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                let error = create_error(
                    seq,
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {}", e),
                );
                let _ = tx.send(ClientOutbound::Error(error));
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                let seq = unknown.seq;
                if is_handshaken(&state, client_id).await && !check_and_update_seq(&state, client_id, seq).await {
                    let error = create_error(
                        seq,
                        ErrorCode::InvalidCommand,
                        "seq must be strictly increasing",
                    );
                    let _ = tx.send(ClientOutbound::Error(error));
                    continue;
                }
                let error = create_error(seq, ErrorCode::InvalidCommand, "Unknown message type");
                let _ = tx.send(ClientOutbound::Error(error));
            }
        }
    }

    // Clean up: remove client and release/promote controller if needed.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;

        let was_controller = *controller == Some(client_id);
        clients.retain(|c| c.id != client_id);

        if was_controller {
            // Promote the next available client (lowest id) that asked for
            // control; observers stay observers.
            let next_id = clients
                .iter()
                .filter(|c| c.wants_control && c.handshaken)
                .map(|c| c.id)
                .min();
            *controller = next_id;
            if let Some(new_id) = next_id {
                if let Some(c) = clients.iter_mut().find(|c| c.id == new_id) {
                    c.is_controller = true;
                }
                println!("[Adapter] Controller {} promoted", new_id);
            } else {
                println!("[Adapter] Controller {} released", client_id);
            }
        }
    }

    // Cancel write task
    drop(tx);
    let _ = write_task.await;

    Ok(())
}

/// Map a protocol command into an engine command.
fn map_command(cmd: &CommandMessage) -> Result<ClientCommand, (ErrorCode, String)> {
    match cmd.mode {
        CommandMode::Op => {
            let Some(ref ops) = cmd.ops else {
                return Err((ErrorCode::InvalidCommand, "Missing ops".to_string()));
            };
            if ops.0.is_empty() {
                return Err((ErrorCode::InvalidCommand, "Empty ops".to_string()));
            }
            let mut mapped = ArrayVec::<GameOp, 32>::new();
            for req in ops.0.iter() {
                let op = map_op(req)?;
                if mapped.try_push(op).is_err() {
                    return Err((ErrorCode::InvalidCommand, "Too many ops".to_string()));
                }
            }
            Ok(ClientCommand::Ops(mapped))
        }
        CommandMode::Chain => {
            let Some(ref chain) = cmd.chain else {
                return Err((ErrorCode::InvalidChain, "Missing chain".to_string()));
            };
            if chain.0.is_empty() {
                return Err((ErrorCode::InvalidChain, "Empty chain".to_string()));
            }
            let mut cells = ArrayVec::<GridPos, 64>::new();
            for c in chain.0.iter() {
                if cells.try_push(GridPos::new(c.row, c.col)).is_err() {
                    return Err((ErrorCode::InvalidChain, "Chain too long".to_string()));
                }
            }
            Ok(ClientCommand::Chain(cells))
        }
    }
}

/// Map an op request to an engine op; the selection ops carry a cell.
fn map_op(req: &OpRequest) -> Result<GameOp, (ErrorCode, String)> {
    fn cell_of(req: &OpRequest) -> Result<(u8, u8), (ErrorCode, String)> {
        match (req.row, req.col) {
            (Some(row), Some(col)) => Ok((row, col)),
            _ => Err((
                ErrorCode::InvalidCommand,
                "Op requires row and col".to_string(),
            )),
        }
    }

    Ok(match req.op {
        OpName::StartSelection => {
            let (row, col) = cell_of(req)?;
            GameOp::StartSelection { row, col }
        }
        OpName::ExtendSelection => {
            let (row, col) = cell_of(req)?;
            GameOp::ExtendSelection { row, col }
        }
        OpName::CommitSelection => GameOp::CommitSelection,
        OpName::ResetRun => GameOp::ResetRun,
        OpName::AdvanceLevel => GameOp::AdvanceLevel,
        OpName::GoHome => GameOp::GoHome,
    })
}

/// Build observation message from a game snapshot
pub fn build_observation(
    snap: &GameSnapshot,
    seq: u64,
    last_resolution: Option<LastResolution>,
) -> ObservationMessage {
    use std::hash::{Hash, Hasher};

    let rows = snap.rows as usize;
    let cols = snap.cols as usize;

    // Build board grids, row-major
    let mut faces = Vec::with_capacity(rows);
    let mut powerups = Vec::with_capacity(rows);
    for r in 0..rows {
        let start = r * cols;
        faces.push(snap.faces[start..start + cols].to_vec());
        powerups.push(snap.powerups[start..start + cols].to_vec());
    }

    // Build state hash; tile identity is deliberately not part of the wire
    // state, only what a player could see.
    let mut hasher = Fnv1aHasher::new();
    snap.phase.hash(&mut hasher);
    snap.rows.hash(&mut hasher);
    snap.cols.hash(&mut hasher);
    snap.faces.hash(&mut hasher);
    snap.powerups.hash(&mut hasher);
    snap.selection.hash(&mut hasher);
    snap.score.hash(&mut hasher);
    snap.level_index.hash(&mut hasher);
    snap.moves_remaining.hash(&mut hasher);
    snap.move_budget.hash(&mut hasher);
    snap.targets.hash(&mut hasher);
    snap.combo_meter.hash(&mut hasher);
    snap.combo_streak.hash(&mut hasher);
    snap.multiplier_turns.hash(&mut hasher);
    snap.episode_id.hash(&mut hasher);
    snap.commit_id.hash(&mut hasher);
    // Include last_resolution since it is part of the observation payload.
    last_resolution.is_some().hash(&mut hasher);
    if let Some(res) = last_resolution.as_ref() {
        res.removal_count.hash(&mut hasher);
        res.chain_len.hash(&mut hasher);
        res.score_delta.hash(&mut hasher);
        res.moves_delta.hash(&mut hasher);
        res.combo_breakout.hash(&mut hasher);
        res.extra_moves.hash(&mut hasher);
        res.multiplier_activated.hash(&mut hasher);
        res.bomb_activated.hash(&mut hasher);
    }
    let state_hash = StateHash(hasher.finish());

    let selection: Vec<CellRef> = snap.selection.iter().copied().map(CellRef::from).collect();

    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        playable: snap.playable(),
        phase: snap.phase.into(),
        episode_id: snap.episode_id,
        commit_id: snap.commit_id,
        board: BoardSnapshot {
            rows: snap.rows,
            cols: snap.cols,
            faces,
            powerups,
        },
        selection,
        score: snap.score,
        level: snap.level_index,
        moves_remaining: snap.moves_remaining,
        move_budget: snap.move_budget,
        targets: TargetsSnapshot::from(snap.targets),
        combo_meter: snap.combo_meter,
        combo_streak: snap.combo_streak,
        multiplier_turns: snap.multiplier_turns,
        last_resolution,
        state_hash,
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
