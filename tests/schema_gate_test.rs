//! Gate tests keeping docs/adapter-protocol.schema.json in step with the
//! message types actually spoken on the wire.

use chainpop::adapter::protocol::{
    create_hello, create_welcome, parse_message, AssignedRole, ErrorCode, ParsedMessage,
    PROTOCOL_VERSION,
};
use chainpop::adapter::build_observation;
use chainpop::core::{GameSnapshot, GameState};
use chainpop::types::GameOp;

fn schema() -> serde_json::Value {
    let s = std::fs::read_to_string("docs/adapter-protocol.schema.json")
        .expect("read docs/adapter-protocol.schema.json");
    serde_json::from_str(&s).expect("schema must be valid json")
}

fn required_keys(definition: &serde_json::Value) -> Vec<String> {
    definition["required"]
        .as_array()
        .expect("definition lists required keys")
        .iter()
        .map(|k| k.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn adapter_protocol_schema_is_valid_json() {
    let v = schema();
    assert_eq!(v["title"], "Chainpop AI Adapter Protocol");

    let defs = v["definitions"].as_object().expect("definitions object");
    for name in [
        "hello",
        "command",
        "control",
        "welcome",
        "ack",
        "error",
        "observation",
    ] {
        assert!(defs.contains_key(name), "schema is missing {name}");
    }
}

#[test]
fn schema_op_names_all_parse() {
    let v = schema();
    let ops = v["definitions"]["command"]["properties"]["ops"]["items"]["properties"]["op"]
        ["enum"]
        .as_array()
        .expect("op enum");
    assert_eq!(ops.len(), 6);

    for op in ops {
        let op = op.as_str().unwrap();
        let line = format!(
            r#"{{"type":"command","seq":1,"ts":1,"mode":"op","ops":[{{"op":"{op}","row":0,"col":0}}]}}"#
        );
        match parse_message(&line).unwrap() {
            ParsedMessage::Command(cmd) => {
                let ops = cmd.ops.expect("ops present");
                assert_eq!(ops.0.len(), 1);
            }
            other => panic!("{op} did not parse as a command: {other:?}"),
        }
    }
}

#[test]
fn schema_error_codes_match_the_enum() {
    let v = schema();
    let listed: Vec<String> = v["definitions"]["error"]["properties"]["code"]["enum"]
        .as_array()
        .expect("error code enum")
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();

    let codes = [
        ErrorCode::HandshakeRequired,
        ErrorCode::ProtocolMismatch,
        ErrorCode::NotController,
        ErrorCode::ControllerActive,
        ErrorCode::InvalidCommand,
        ErrorCode::InvalidChain,
        ErrorCode::Backpressure,
    ];
    assert_eq!(listed.len(), codes.len());
    for code in codes {
        let serialized = serde_json::to_value(code).unwrap();
        let serialized = serialized.as_str().unwrap();
        assert!(
            listed.iter().any(|l| l == serialized),
            "schema is missing error code {serialized}"
        );
    }
}

#[test]
fn live_messages_carry_schema_required_fields() {
    let v = schema();

    // hello
    let hello = create_hello(1, "schema-gate", PROTOCOL_VERSION);
    let hello_v = serde_json::to_value(&hello).unwrap();
    for key in required_keys(&v["definitions"]["hello"]) {
        assert!(hello_v.get(&key).is_some(), "hello is missing {key}");
    }

    // welcome
    let welcome = create_welcome(2, PROTOCOL_VERSION, 1, AssignedRole::Controller, Some(1));
    let welcome_v = serde_json::to_value(&welcome).unwrap();
    for key in required_keys(&v["definitions"]["welcome"]) {
        assert!(welcome_v.get(&key).is_some(), "welcome is missing {key}");
    }

    // observation built from a live game
    let mut game = GameState::new(1);
    game.apply_op(GameOp::ResetRun);
    let mut snapshot = GameSnapshot::default();
    game.snapshot_into(&mut snapshot);
    let obs = build_observation(&snapshot, 3, None);
    let obs_v = serde_json::to_value(&obs).unwrap();
    for key in required_keys(&v["definitions"]["observation"]) {
        assert!(obs_v.get(&key).is_some(), "observation is missing {key}");
    }

    // phase values stay inside the schema's enum
    let phases = v["definitions"]["observation"]["properties"]["phase"]["enum"]
        .as_array()
        .unwrap();
    assert!(phases.contains(&obs_v["phase"]));
}
