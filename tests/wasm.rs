#![cfg(target_arch = "wasm32")]

use wasm_bindgen_test::*;

use prsi_core::{MatchEngine, MatchPhase, MatchState};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn match_engine_starts_a_playable_match() {
    let engine = MatchEngine::new(None).expect("default match should start");
    let json = engine.state_json().expect("state should serialize");
    let state: MatchState = serde_json::from_str(&json).expect("state should parse back");

    assert_eq!(state.participants.len(), 4);
    assert_eq!(state.phase, MatchPhase::AwaitingAction);
    assert_eq!(state.total_cards(), 32);
}

#[wasm_bindgen_test]
fn out_of_turn_draw_is_rejected_not_thrown() {
    let mut engine = MatchEngine::new(None).expect("default match should start");

    // push the turn away from the human seat first
    let state_json = engine.state_json().expect("state");
    let mut state: MatchState = serde_json::from_str(&state_json).expect("parse");
    state.current = 1;
    engine
        .set_state_json(&serde_json::to_string(&state).expect("serialize"))
        .expect("state should load");

    let response = engine.submit_human_draw().expect("call should not throw");
    assert!(response.contains("\"accepted\":false"));
    assert!(response.contains("notYourTurn"));
}
