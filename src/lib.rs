pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, DecisionReason, GameAction};
pub use game::{
    can_follow, is_legal_play, rejection_notice, Card, CardId, CardKind, Deck, DeckVariant,
    DiscardPile, DrawAction, GameEvent, IntegrityError, MatchConfig, MatchOutcome, MatchPhase,
    MatchState, Notice, NoticeKey, Participant, ParticipantKind, PlayAction, Rank, RuleEngine,
    RuleError, RuleResolution, SeatIndex, Severity, Suit, SuitChoiceAction,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution(state: &MatchState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

/// 可恢复的拒绝走 `accepted: false` 通道，只有引擎内部错误才抛异常。
fn is_fatal(error: &RuleError) -> bool {
    matches!(error, RuleError::IntegrityViolation { .. })
}

#[derive(Serialize)]
struct SubmitResponse {
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<RuleError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<RuleResolution>,
}

impl SubmitResponse {
    fn accepted(resolution: RuleResolution) -> Self {
        Self {
            accepted: true,
            reason: None,
            notice: None,
            resolution: Some(resolution),
        }
    }

    fn rejected(state: &MatchState, error: RuleError) -> Self {
        Self {
            accepted: false,
            notice: rejection_notice(state, &error),
            reason: Some(error),
            resolution: None,
        }
    }
}

#[derive(Serialize)]
struct AutomatedMoveResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<AiDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct MatchEngine {
    state: MatchState,
}

#[wasm_bindgen]
impl MatchEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MatchEngine, JsValue> {
        let config: MatchConfig = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => MatchConfig::default(),
        };
        let mut engine = RuleEngine::new();
        let state = engine.start_match(&config).map_err(to_js_error)?;
        web_sys::console::log_1(
            &format!(
                "prsi match started: {} seats, {} cards",
                state.participants.len(),
                state.total_cards()
            )
            .into(),
        );
        Ok(MatchEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: MatchState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn submit_human_play(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: PlayAction = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        self.submit(|engine, state| engine.play_card(state, action))
    }

    pub fn submit_human_draw(&mut self) -> Result<String, JsValue> {
        let seat = self.human_seat()?;
        self.submit(|engine, state| engine.draw_cards(state, DrawAction { seat }))
    }

    pub fn submit_suit_choice(&mut self, suit: &str) -> Result<String, JsValue> {
        let suit = Suit::from_str(suit)
            .map_err(|_| JsValue::from_str(&format!("unknown suit: {suit}")))?;
        let seat = self.human_seat()?;
        self.submit(|engine, state| engine.choose_suit(state, SuitChoiceAction { seat, suit }))
    }

    /// 让当前自动座位走一步，返回决策与落地后的结算。
    pub fn apply_automated_turn(&mut self) -> Result<String, JsValue> {
        let agent = AiAgent::new(AiConfig::default());
        let decision = agent.decide_action(&self.state, self.state.current);
        let applied = match &decision {
            Some(decision) => Some(self.apply_game_action(decision.action.clone())?),
            None => None,
        };
        let response = AutomatedMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    /// 纯粹的节奏延迟：先快照状态，延迟结束后再基于快照算决策。
    pub fn think_automated(&self, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        future_to_promise(async move {
            let mut agent = AiAgent::new(AiConfig::default());
            let delay = delay_ms.unwrap_or_else(|| agent.think_delay_ms());
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let decision = agent.decide_action(&state, state.current);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn winner(&self) -> Option<SeatIndex> {
        self.state.outcome.as_ref().map(|outcome| outcome.winner)
    }

    fn human_seat(&self) -> Result<SeatIndex, JsValue> {
        self.state
            .human_seat()
            .ok_or_else(|| JsValue::from_str("no human seat in this match"))
    }

    fn submit<F>(&mut self, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(&mut RuleEngine, &mut MatchState) -> Result<Vec<GameEvent>, RuleError>,
    {
        let mut engine = RuleEngine::new();
        let response = match action(&mut engine, &mut self.state) {
            Ok(events) => SubmitResponse::accepted(make_resolution(&self.state, events)),
            Err(error) if is_fatal(&error) => return Err(to_js_error(error)),
            Err(error) => SubmitResponse::rejected(&self.state, error),
        };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    fn apply_game_action(&mut self, action: GameAction) -> Result<RuleResolution, JsValue> {
        let mut engine = RuleEngine::new();
        let events = match action {
            GameAction::PlayCard { action } => engine
                .play_card(&mut self.state, action)
                .map_err(to_js_error)?,
            GameAction::Draw { action } => engine
                .draw_cards(&mut self.state, action)
                .map_err(to_js_error)?,
        };
        Ok(make_resolution(&self.state, events))
    }
}

/// 按配置开一局新对局并返回初始状态。
#[wasm_bindgen(js_name = "createMatch")]
pub fn create_match(config: JsValue) -> Result<JsValue, JsValue> {
    let config: MatchConfig = if config.is_undefined() || config.is_null() {
        MatchConfig::default()
    } else {
        from_value(config).map_err(JsValue::from)?
    };
    let mut engine = RuleEngine::new();
    let state = engine.start_match(&config).map_err(to_js_error)?;
    let events = state.event_log.clone();
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "playCard")]
pub fn play_card(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: MatchState = from_value(state).map_err(JsValue::from)?;
    let action: PlayAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.play_card(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "drawCards")]
pub fn draw_cards(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: MatchState = from_value(state).map_err(JsValue::from)?;
    let action: DrawAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.draw_cards(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

#[wasm_bindgen(js_name = "chooseSuit")]
pub fn choose_suit(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: MatchState = from_value(state).map_err(JsValue::from)?;
    let action: SuitChoiceAction = from_value(action).map_err(JsValue::from)?;
    let mut engine = RuleEngine::new();
    match engine.choose_suit(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

/// 只计算当前自动座位的决策，不落地。
#[wasm_bindgen(js_name = "automatedTurn")]
pub fn automated_turn(state: JsValue) -> Result<JsValue, JsValue> {
    let state: MatchState = from_value(state).map_err(JsValue::from)?;
    let agent = AiAgent::new(AiConfig::default());
    let decision = agent.decide_action(&state, state.current);
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkWinner")]
pub fn check_winner(state: JsValue) -> Result<JsValue, JsValue> {
    let state: MatchState = from_value(state).map_err(JsValue::from)?;
    to_value(&state.outcome).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: MatchState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
