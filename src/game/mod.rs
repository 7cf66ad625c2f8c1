//! 游戏核心逻辑模块（牌与牌堆、回合状态机、规则引擎等）。

pub mod effects;
pub mod rules;
pub mod state;

pub use effects::{
    apply_suit_choice,
    can_follow,
    is_legal_play,
    playable_cards,
    resolve_on_play,
    CardKind,
    EffectResolution,
    PENALTY_STEP,
};
pub use rules::{
    rejection_notice,
    DrawAction,
    MatchConfig,
    Notice,
    NoticeKey,
    PlayAction,
    RuleEngine,
    RuleError,
    RuleResolution,
    Severity,
    SuitChoiceAction,
};
pub use state::{
    Card,
    CardId,
    Deck,
    DeckVariant,
    DiscardPile,
    GameEvent,
    IntegrityError,
    MatchOutcome,
    MatchPhase,
    MatchState,
    Participant,
    ParticipantKind,
    Rank,
    SeatIndex,
    Suit,
};
