//! Protocol module - JSON message types for AI adapter
//!
//! Implements the line-delimited JSON protocol for driving a game remotely.
//! All messages have: type, seq (sequence number), ts (timestamp in ms)

use serde::{Deserialize, Serialize};

use crate::types::{
    GamePhase, GridPos, MatchTier, ResolutionResult, TileColor, TileFace, PALETTE_SIZE,
};

use arrayvec::ArrayVec;

/// Protocol version spoken by this adapter; clients must match the major
pub const PROTOCOL_VERSION: &str = "1.0.0";

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    Hello,
}

impl Default for HelloType {
    fn default() -> Self {
        Self::Hello
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    #[serde(rename = "command")]
    Command,
}

impl Default for CommandType {
    fn default() -> Self {
        Self::Command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlType {
    #[serde(rename = "control")]
    Control,
}

impl Default for ControlType {
    fn default() -> Self {
        Self::Control
    }
}

/// Client hello message (first message to establish connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    pub formats: FormatsList,
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatsList {
    pub json: bool,
}

impl<'de> Deserialize<'de> for FormatsList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = FormatsList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of format strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut json = false;
                while let Some(v) = seq.next_element::<&str>()? {
                    if v.eq_ignore_ascii_case("json") {
                        json = true;
                    }
                }
                Ok(FormatsList { json })
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for FormatsList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(if self.json { 1 } else { 0 }))?;
        if self.json {
            seq.serialize_element("json")?;
        }
        seq.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(rename = "stream_observations")]
    pub stream_observations: bool,
    #[serde(rename = "command_mode")]
    pub command_mode: CommandMode,
    /// Optional role request for deterministic controller/observer
    /// negotiation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RequestedRole>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestedRole {
    Auto,
    Controller,
    Observer,
}

impl<'de> Deserialize<'de> for RequestedRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else if s.eq_ignore_ascii_case("controller") {
            Ok(Self::Controller)
        } else if s.eq_ignore_ascii_case("observer") {
            Ok(Self::Observer)
        } else {
            Err(serde::de::Error::custom("invalid requested role"))
        }
    }
}

impl Serialize for RequestedRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            RequestedRole::Auto => serializer.serialize_str("auto"),
            RequestedRole::Controller => serializer.serialize_str("controller"),
            RequestedRole::Observer => serializer.serialize_str("observer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignedRole {
    #[serde(rename = "controller")]
    Controller,
    #[serde(rename = "observer")]
    Observer,
}

/// Command message (controller only)
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub mode: CommandMode,
    /// For op mode
    #[serde(default)]
    pub ops: Option<OpList>,
    /// For chain mode
    #[serde(default)]
    pub chain: Option<ChainList>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandMode {
    Op,
    Chain,
}

impl<'de> Deserialize<'de> for CommandMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("op") {
            Ok(Self::Op)
        } else if s.eq_ignore_ascii_case("chain") {
            Ok(Self::Chain)
        } else {
            Err(serde::de::Error::custom("invalid command mode"))
        }
    }
}

impl Serialize for CommandMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CommandMode::Op => serializer.serialize_str("op"),
            CommandMode::Chain => serializer.serialize_str("chain"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpName {
    StartSelection,
    ExtendSelection,
    CommitSelection,
    ResetRun,
    AdvanceLevel,
    GoHome,
}

impl<'de> Deserialize<'de> for OpName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("startSelection") {
            Ok(Self::StartSelection)
        } else if s.eq_ignore_ascii_case("extendSelection") {
            Ok(Self::ExtendSelection)
        } else if s.eq_ignore_ascii_case("commitSelection") {
            Ok(Self::CommitSelection)
        } else if s.eq_ignore_ascii_case("resetRun") {
            Ok(Self::ResetRun)
        } else if s.eq_ignore_ascii_case("advanceLevel") {
            Ok(Self::AdvanceLevel)
        } else if s.eq_ignore_ascii_case("goHome") {
            Ok(Self::GoHome)
        } else {
            Err(serde::de::Error::custom("unknown op"))
        }
    }
}

/// One requested operation; `row`/`col` are required for the selection ops
/// and ignored by the rest
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OpRequest {
    pub op: OpName,
    #[serde(default)]
    pub row: Option<u8>,
    #[serde(default)]
    pub col: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct OpList(pub ArrayVec<OpRequest, 32>);

impl<'de> Deserialize<'de> for OpList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = OpList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of op objects")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<OpRequest, 32>::new();
                while let Some(op) = seq.next_element::<OpRequest>()? {
                    out.try_push(op)
                        .map_err(|_| serde::de::Error::custom("too many ops"))?;
                }
                Ok(OpList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// A cell reference on the wire: a two-element `[row, col]` array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u8,
    pub col: u8,
}

impl From<GridPos> for CellRef {
    fn from(value: GridPos) -> Self {
        Self {
            row: value.row,
            col: value.col,
        }
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = CellRef;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a [row, col] pair")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let row = seq
                    .next_element::<u8>()?
                    .ok_or_else(|| serde::de::Error::custom("missing row"))?;
                let col = seq
                    .next_element::<u8>()?
                    .ok_or_else(|| serde::de::Error::custom("missing col"))?;
                Ok(CellRef { row, col })
            }
        }

        deserializer.deserialize_seq(V)
    }
}

impl Serialize for CellRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.row)?;
        seq.serialize_element(&self.col)?;
        seq.end()
    }
}

/// A whole chain sent at once; the server starts, extends, and commits it
#[derive(Debug, Clone)]
pub struct ChainList(pub ArrayVec<CellRef, 64>);

impl<'de> Deserialize<'de> for ChainList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ChainList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of [row, col] pairs")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<CellRef, 64>::new();
                while let Some(cell) = seq.next_element::<CellRef>()? {
                    out.try_push(cell)
                        .map_err(|_| serde::de::Error::custom("chain too long"))?;
                }
                Ok(ChainList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ControlType,
    pub seq: u64,
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Claim,
    Release,
}

impl<'de> Deserialize<'de> for ControlAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("claim") {
            Ok(Self::Claim)
        } else if s.eq_ignore_ascii_case("release") {
            Ok(Self::Release)
        } else {
            Err(serde::de::Error::custom("invalid control action"))
        }
    }
}

impl Serialize for ControlAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ControlAction::Claim => serializer.serialize_str("claim"),
            ControlAction::Release => serializer.serialize_str("release"),
        }
    }
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "not_controller")]
    NotController,
    #[serde(rename = "controller_active")]
    ControllerActive,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "invalid_chain")]
    InvalidChain,
    #[serde(rename = "backpressure")]
    Backpressure,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AssignedRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub formats: [CapabilityFormat; 1],
    #[serde(rename = "command_modes")]
    pub command_modes: [CapabilityCommandMode; 2],

    /// Feature flags (legacy): union of always-present and optional features.
    pub features: Vec<CapabilityFeature>,

    /// Features that are guaranteed to be present in every observation payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "features_always")]
    pub features_always: Vec<CapabilityFeature>,

    /// Features that may be omitted when unknown/not-applicable.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "features_optional")]
    pub features_optional: Vec<CapabilityFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFormat {
    #[serde(rename = "json")]
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityCommandMode {
    #[serde(rename = "op")]
    Op,
    #[serde(rename = "chain")]
    Chain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFeature {
    #[serde(rename = "board")]
    Board,
    #[serde(rename = "powerups")]
    Powerups,
    #[serde(rename = "selection")]
    Selection,
    #[serde(rename = "targets")]
    Targets,
    #[serde(rename = "combo")]
    Combo,
    #[serde(rename = "multiplier")]
    Multiplier,
    #[serde(rename = "last_resolution")]
    LastResolution,
    #[serde(rename = "state_hash")]
    StateHash,
    #[serde(rename = "score")]
    Score,
    #[serde(rename = "moves")]
    Moves,
}

/// Acknowledgment for command receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Game state observation (sent to all clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub playable: bool,
    pub phase: PhaseLower,
    #[serde(rename = "episode_id")]
    pub episode_id: u32,
    #[serde(rename = "commit_id")]
    pub commit_id: u32,
    pub board: BoardSnapshot,
    /// Active chain path, selection order
    pub selection: Vec<CellRef>,
    pub score: u32,
    pub level: u32,
    #[serde(rename = "moves_remaining")]
    pub moves_remaining: u32,
    #[serde(rename = "move_budget")]
    pub move_budget: u32,
    pub targets: TargetsSnapshot,
    #[serde(rename = "combo_meter")]
    pub combo_meter: u32,
    #[serde(rename = "combo_streak")]
    pub combo_streak: u32,
    #[serde(rename = "multiplier_turns")]
    pub multiplier_turns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "last_resolution")]
    pub last_resolution: Option<LastResolution>,
    #[serde(rename = "state_hash")]
    pub state_hash: StateHash,
}

/// Row-major cell grids; `faces` and `powerups` are `rows` arrays of `cols`
/// codes each (face codes 0-7, powerup codes 0-3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: u8,
    pub cols: u8,
    pub faces: Vec<Vec<u8>>,
    pub powerups: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseLower {
    #[serde(rename = "home")]
    Home,
    #[serde(rename = "playing")]
    Playing,
    #[serde(rename = "levelup")]
    LevelUp,
    #[serde(rename = "won")]
    Won,
    #[serde(rename = "lost")]
    Lost,
}

impl From<GamePhase> for PhaseLower {
    fn from(value: GamePhase) -> Self {
        match value {
            GamePhase::Home => Self::Home,
            GamePhase::Playing => Self::Playing,
            GamePhase::LevelUp => Self::LevelUp,
            GamePhase::Won => Self::Won,
            GamePhase::Lost => Self::Lost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorLower {
    #[serde(rename = "red")]
    Red,
    #[serde(rename = "blue")]
    Blue,
    #[serde(rename = "yellow")]
    Yellow,
    #[serde(rename = "green")]
    Green,
    #[serde(rename = "purple")]
    Purple,
}

impl From<TileColor> for ColorLower {
    fn from(value: TileColor) -> Self {
        match value {
            TileColor::Red => Self::Red,
            TileColor::Blue => Self::Blue,
            TileColor::Yellow => Self::Yellow,
            TileColor::Green => Self::Green,
            TileColor::Purple => Self::Purple,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierLower {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "bonus")]
    Bonus,
    #[serde(rename = "super")]
    Super,
}

impl From<MatchTier> for TierLower {
    fn from(value: MatchTier) -> Self {
        match value {
            MatchTier::Normal => Self::Normal,
            MatchTier::Bonus => Self::Bonus,
            MatchTier::Super => Self::Super,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardLower {
    #[serde(rename = "special")]
    Special,
    #[serde(rename = "rainbow")]
    Rainbow,
}

/// Remaining removals per color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetsSnapshot {
    pub red: u16,
    pub blue: u16,
    pub yellow: u16,
    pub green: u16,
    pub purple: u16,
}

impl From<[u16; PALETTE_SIZE]> for TargetsSnapshot {
    fn from(counts: [u16; PALETTE_SIZE]) -> Self {
        Self {
            red: counts[0],
            blue: counts[1],
            yellow: counts[2],
            green: counts[3],
            purple: counts[4],
        }
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for i in 0..16 {
            let nib = (v & 0x0f) as usize;
            buf[15 - i] = HEX[nib];
            v >>= 4;
        }
        let s = std::str::from_utf8(&buf).expect("hex is valid utf8");
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        let s = s.trim();
        let mut v: u64 = 0;
        for b in s.as_bytes() {
            let d = match b {
                b'0'..=b'9' => (b - b'0') as u64,
                b'a'..=b'f' => (b - b'a' + 10) as u64,
                b'A'..=b'F' => (b - b'A' + 10) as u64,
                _ => return Err(serde::de::Error::custom("invalid hex")),
            };
            v = (v << 4) | d;
        }
        Ok(StateHash(v))
    }
}

/// Result of the most recent resolved commit, included in the next
/// observation and then dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastResolution {
    #[serde(rename = "removal_count")]
    pub removal_count: u32,
    #[serde(rename = "chain_len")]
    pub chain_len: u32,
    pub tier: TierLower,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "chain_color")]
    pub chain_color: Option<ColorLower>,
    #[serde(rename = "score_delta")]
    pub score_delta: u32,
    #[serde(rename = "moves_delta")]
    pub moves_delta: i32,
    #[serde(rename = "combo_breakout")]
    pub combo_breakout: bool,
    #[serde(rename = "extra_moves")]
    pub extra_moves: u32,
    #[serde(rename = "multiplier_activated")]
    pub multiplier_activated: bool,
    #[serde(rename = "bomb_activated")]
    pub bomb_activated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<RewardLower>,
    pub cleared: Vec<CellRef>,
}

impl From<ResolutionResult> for LastResolution {
    fn from(value: ResolutionResult) -> Self {
        Self {
            removal_count: value.removal_count,
            chain_len: value.chain_len,
            tier: value.tier.into(),
            chain_color: value.chain_color.map(ColorLower::from),
            score_delta: value.score_delta,
            moves_delta: value.moves_delta,
            combo_breakout: value.combo_breakout,
            extra_moves: value.extra_moves,
            multiplier_activated: value.multiplier_activated,
            bomb_activated: value.bomb_activated,
            reward: value.reward.and_then(|face| match face {
                TileFace::Special => Some(RewardLower::Special),
                TileFace::Rainbow => Some(RewardLower::Rainbow),
                TileFace::Color(_) => None,
            }),
            cleared: value.cleared.into_iter().map(CellRef::from).collect(),
        }
    }
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // Unknown message type is not a hard parse error for the protocol.
            #[derive(Debug, Deserialize)]
            struct TypeOnly<'a> {
                #[serde(rename = "type")]
                msg_type: Option<&'a str>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or("unknown");
            if msg_type != "hello" && msg_type != "command" && msg_type != "control" {
                #[derive(Debug, Deserialize)]
                struct SeqOnly {
                    seq: Option<u64>,
                }
                let seq = serde_json::from_str::<SeqOnly>(json)?.seq.unwrap_or(0);
                return Ok(ParsedMessage::Unknown(UnknownMessage { seq }));
            }
            Err(e)
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, protocol_version: &str) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: protocol_version.to_string(),
        formats: FormatsList { json: true },
        requested: RequestedCapabilities {
            stream_observations: true,
            command_mode: CommandMode::Op,
            role: Some(RequestedRole::Auto),
        },
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id: Some(client_id),
        role: Some(role),
        controller_id,
        game_id: "chainpop".to_string(),
        capabilities: ServerCapabilities {
            formats: [CapabilityFormat::Json],
            command_modes: [CapabilityCommandMode::Op, CapabilityCommandMode::Chain],
            features: vec![
                CapabilityFeature::Board,
                CapabilityFeature::Powerups,
                CapabilityFeature::Selection,
                CapabilityFeature::Targets,
                CapabilityFeature::Combo,
                CapabilityFeature::Multiplier,
                CapabilityFeature::LastResolution,
                CapabilityFeature::StateHash,
                CapabilityFeature::Score,
                CapabilityFeature::Moves,
            ],

            features_always: vec![
                CapabilityFeature::Board,
                CapabilityFeature::Powerups,
                CapabilityFeature::Selection,
                CapabilityFeature::Targets,
                CapabilityFeature::Combo,
                CapabilityFeature::Multiplier,
                CapabilityFeature::StateHash,
                CapabilityFeature::Score,
                CapabilityFeature::Moves,
            ],
            features_optional: vec![CapabilityFeature::LastResolution],
        },
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64, _command_seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
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
