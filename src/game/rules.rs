use serde::{Deserialize, Serialize};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::{
    effects,
    state::{
        CardId, DeckVariant, GameEvent, IntegrityError, MatchOutcome, MatchPhase, MatchState,
        ParticipantKind, SeatIndex, Suit,
    },
};

/// 开局配置；`seed` 仅用于可复现实验与测试。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchConfig {
    #[serde(default)]
    pub deck_variant: DeckVariant,
    #[serde(default = "default_participant_count")]
    pub participant_count: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_participant_count() -> u8 {
    4
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            deck_variant: DeckVariant::default(),
            participant_count: default_participant_count(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayAction {
    pub seat: SeatIndex,
    pub card_id: CardId,
    #[serde(default)]
    pub chosen_suit: Option<Suit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawAction {
    pub seat: SeatIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuitChoiceAction {
    pub seat: SeatIndex,
    pub suit: Suit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    MatchNotStarted,
    MatchFinished,
    OutOfTurn { seat: SeatIndex },
    SuitChoicePending,
    NoSuitChoicePending,
    ParticipantNotFound { seat: SeatIndex },
    CardNotFound { card_id: CardId },
    IllegalMove { card_id: CardId },
    InvalidParticipantCount { requested: u8 },
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Success,
}

/// 提示消息键，与展示层的翻译表一一对应。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKey {
    PlayerTurn,
    EnemyTurn,
    CannotPlayCard,
    DeckEmpty,
    NoDiscardCards,
    YouWon,
    EnemyWon,
    NotYourTurn,
    MustPlaySuit,
    MustPlaySevenOrDraw,
    PlayerSkipped,
    ChooseSuit,
}

/// 引擎只给出消息键、级别和结构化参数，本地化由展示层完成。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub key: NoticeKey,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<SeatIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit: Option<Suit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u8>,
}

impl Notice {
    pub fn new(key: NoticeKey, severity: Severity) -> Self {
        Self {
            key,
            severity,
            seat: None,
            suit: None,
            count: None,
        }
    }

    pub fn info(key: NoticeKey) -> Self {
        Self::new(key, Severity::Info)
    }

    pub fn error(key: NoticeKey) -> Self {
        Self::new(key, Severity::Error)
    }

    pub fn success(key: NoticeKey) -> Self {
        Self::new(key, Severity::Success)
    }

    pub fn with_seat(mut self, seat: SeatIndex) -> Self {
        self.seat = Some(seat);
        self
    }

    pub fn with_suit(mut self, suit: Suit) -> Self {
        self.suit = Some(suit);
        self
    }

    pub fn with_count(mut self, count: u8) -> Self {
        self.count = Some(count);
        self
    }
}

/// 被拒绝的动作对应的用户可见提示；静默拒绝的场合返回 `None`。
pub fn rejection_notice(state: &MatchState, error: &RuleError) -> Option<Notice> {
    match error {
        RuleError::IllegalMove { .. } => Some(if state.pending_sevens {
            Notice::error(NoticeKey::MustPlaySevenOrDraw).with_count(state.seven_stack)
        } else if let Some(suit) = state.forced_suit {
            Notice::error(NoticeKey::MustPlaySuit).with_suit(suit)
        } else {
            Notice::error(NoticeKey::CannotPlayCard)
        }),
        RuleError::OutOfTurn { .. } => Some(Notice::error(NoticeKey::NotYourTurn)),
        RuleError::SuitChoicePending => Some(Notice::error(NoticeKey::ChooseSuit)),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: MatchState,
    pub events: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
}

impl RuleResolution {
    pub fn new(state: MatchState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome.clone();
        if let Some(ref outcome) = outcome {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::MatchWon { .. }));
            if !has_event {
                events.push(GameEvent::MatchWon {
                    winner: outcome.winner,
                });
            }
        }

        let mut notices = Vec::new();
        for event in &events {
            match event {
                GameEvent::TurnSkipped { seat } => {
                    notices.push(Notice::info(NoticeKey::PlayerSkipped).with_seat(*seat));
                }
                GameEvent::DeckRecycled { .. } => {
                    notices.push(Notice::info(NoticeKey::DeckEmpty));
                }
                GameEvent::DeckExhausted { .. } => {
                    notices.push(Notice::info(NoticeKey::NoDiscardCards));
                }
                GameEvent::SuitChoiceRequested { seat } => {
                    notices.push(Notice::info(NoticeKey::ChooseSuit).with_seat(*seat));
                }
                GameEvent::MatchWon { winner } => {
                    let notice = if state.human_seat() == Some(*winner) {
                        Notice::success(NoticeKey::YouWon)
                    } else {
                        Notice::success(NoticeKey::EnemyWon).with_seat(*winner)
                    };
                    notices.push(notice);
                }
                _ => {}
            }
        }

        if outcome.is_none() && state.phase == MatchPhase::AwaitingAction {
            let on_turn = state.current_participant();
            let indicator = match on_turn.map(|p| p.kind) {
                Some(ParticipantKind::Human) => Notice::info(NoticeKey::PlayerTurn),
                _ => Notice::info(NoticeKey::EnemyTurn).with_seat(state.current),
            };
            notices.push(indicator);
            if let Some(suit) = state.forced_suit {
                notices.push(Notice::info(NoticeKey::MustPlaySuit).with_suit(suit));
            }
            if state.pending_sevens {
                notices.push(
                    Notice::info(NoticeKey::MustPlaySevenOrDraw).with_count(state.seven_stack),
                );
            }
        }

        Self {
            state,
            events,
            notices,
            outcome,
        }
    }
}

/// 规则引擎：洗牌所需的随机源挂在引擎上，状态本身保持可序列化。
pub struct RuleEngine {
    rng: SmallRng,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn ensure_active(state: &MatchState) -> Result<(), RuleError> {
        if state.is_finished() {
            return Err(RuleError::MatchFinished);
        }
        if state.phase == MatchPhase::NotStarted {
            return Err(RuleError::MatchNotStarted);
        }
        Ok(())
    }

    fn ensure_turn_owner(state: &MatchState, seat: SeatIndex) -> Result<(), RuleError> {
        if state.current != seat {
            return Err(RuleError::OutOfTurn { seat });
        }
        Ok(())
    }

    fn ensure_integrity(state: &MatchState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    pub fn start_match(&mut self, config: &MatchConfig) -> Result<MatchState, RuleError> {
        if !(2..=6).contains(&config.participant_count) {
            return Err(RuleError::InvalidParticipantCount {
                requested: config.participant_count,
            });
        }
        if let Some(seed) = config.seed {
            self.rng = SmallRng::seed_from_u64(seed);
        }

        let mut state = MatchState::new(config.deck_variant, config.participant_count);
        state.begin(&mut self.rng);
        Self::ensure_integrity(&state)?;
        Ok(state)
    }

    pub fn play_card(
        &mut self,
        state: &mut MatchState,
        action: PlayAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        if state.phase == MatchPhase::AwaitingSuitChoice {
            return Err(RuleError::SuitChoicePending);
        }
        Self::ensure_integrity(state)?;
        Self::ensure_turn_owner(state, action.seat)?;

        let participant = state
            .participant(action.seat)
            .ok_or(RuleError::ParticipantNotFound { seat: action.seat })?;
        let hand_index = participant
            .hand_index(action.card_id)
            .ok_or(RuleError::CardNotFound {
                card_id: action.card_id,
            })?;
        if !effects::is_legal_play(state, &participant.hand[hand_index]) {
            return Err(RuleError::IllegalMove {
                card_id: action.card_id,
            });
        }

        // 任何成功出牌都会解除上一张皇后的换色约束
        state.forced_suit = None;

        let card = match state.participant_mut(action.seat) {
            Some(participant) => participant.hand.remove(hand_index),
            None => {
                return Err(RuleError::ParticipantNotFound { seat: action.seat });
            }
        };
        state.discard.place(card);

        let played = GameEvent::CardPlayed {
            seat: action.seat,
            card_id: action.card_id,
        };
        state.record_event(played.clone());
        let mut events = vec![played];

        let resolution = effects::resolve_on_play(state, action.seat, action.chosen_suit);
        events.extend(resolution.events);
        if resolution.suspended {
            // 胜负判定与轮转推迟到换色落地之后
            return Ok(events);
        }

        events.extend(Self::settle_after_play(state, action.seat));
        Ok(events)
    }

    pub fn draw_cards(
        &mut self,
        state: &mut MatchState,
        action: DrawAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        Self::ensure_active(state)?;
        if state.phase == MatchPhase::AwaitingSuitChoice {
            return Err(RuleError::SuitChoicePending);
        }
        Self::ensure_integrity(state)?;
        Self::ensure_turn_owner(state, action.seat)?;
        state
            .participant(action.seat)
            .ok_or(RuleError::ParticipantNotFound { seat: action.seat })?;

        let mut events = Vec::new();
        if state.pending_sevens {
            let count = state.seven_stack;
            for _ in 0..count {
                events.extend(state.draw_to_hand(action.seat, &mut self.rng));
            }
            state.clear_penalty();
            let paid = GameEvent::PenaltyPaid {
                seat: action.seat,
                count,
            };
            state.record_event(paid.clone());
            events.push(paid);
        } else {
            events.extend(state.draw_to_hand(action.seat, &mut self.rng));
        }

        events.extend(state.advance_turn());
        Ok(events)
    }

    pub fn choose_suit(
        &mut self,
        state: &mut MatchState,
        action: SuitChoiceAction,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if state.is_finished() {
            return Err(RuleError::MatchFinished);
        }
        if state.phase != MatchPhase::AwaitingSuitChoice {
            return Err(RuleError::NoSuitChoicePending);
        }
        Self::ensure_turn_owner(state, action.seat)?;

        state.phase = MatchPhase::AwaitingAction;
        let chosen = effects::apply_suit_choice(state, action.seat, action.suit);
        state.record_event(chosen.clone());
        let mut events = vec![chosen];
        events.extend(Self::settle_after_play(state, action.seat));
        Ok(events)
    }

    fn settle_after_play(state: &mut MatchState, seat: SeatIndex) -> Vec<GameEvent> {
        let hand_empty = state
            .participant(seat)
            .map(|p| p.hand.is_empty())
            .unwrap_or(false);
        if hand_empty {
            let outcome = state.declare_winner(seat);
            vec![GameEvent::MatchWon {
                winner: outcome.winner,
            }]
        } else {
            state.advance_turn()
        }
    }
}
