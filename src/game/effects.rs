use serde::{Deserialize, Serialize};

use super::state::{Card, GameEvent, MatchPhase, MatchState, Rank, SeatIndex, Suit};

/// 每张七号牌叠加的罚抽张数。
pub const PENALTY_STEP: u8 = 2;

/// 牌的行为类别，由点数决定的封闭集合。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    Regular,
    SkipNext,
    ForceDraw,
    ChooseSuit,
}

impl CardKind {
    pub fn of(rank: Rank) -> Self {
        match rank {
            Rank::Seven => CardKind::ForceDraw,
            Rank::Queen => CardKind::ChooseSuit,
            Rank::Ace => CardKind::SkipNext,
            _ => CardKind::Regular,
        }
    }

    pub fn is_special(self) -> bool {
        self != CardKind::Regular
    }
}

/// 基础跟牌规则：顶牌为空、花色相同或点数相同。
/// 皇后可压任何牌，七号牌还可压另一张七号牌。
pub fn can_follow(card: &Card, top: Option<&Card>) -> bool {
    let Some(top) = top else {
        return true;
    };
    match card.kind() {
        CardKind::ChooseSuit => true,
        CardKind::ForceDraw => {
            top.kind() == CardKind::ForceDraw || card.suit == top.suit || card.rank == top.rank
        }
        _ => card.suit == top.suit || card.rank == top.rank,
    }
}

/// 出牌合法性的完整判定，规则从上到下依次短路：
/// 罚抽未结清时只能续打七号牌；换色生效时只认指定花色或皇后；否则走基础跟牌规则。
pub fn is_legal_play(state: &MatchState, card: &Card) -> bool {
    if state.pending_sevens {
        return card.kind() == CardKind::ForceDraw;
    }
    if let Some(forced) = state.forced_suit {
        return card.suit == forced || card.kind() == CardKind::ChooseSuit;
    }
    can_follow(card, state.discard.top_card())
}

pub fn playable_cards<'a>(state: &MatchState, hand: &'a [Card]) -> Vec<&'a Card> {
    hand.iter()
        .filter(|card| is_legal_play(state, card))
        .collect()
}

/// 出牌生效的结果；`suspended` 表示效果在等待外部换色输入。
#[derive(Debug, Clone, Default)]
pub struct EffectResolution {
    pub events: Vec<GameEvent>,
    pub suspended: bool,
}

/// 结算刚放到弃牌堆顶那张牌的特殊效果。
/// 皇后在未附带花色时挂起对局，等待 `choose_suit` 补上。
pub fn resolve_on_play(
    state: &mut MatchState,
    seat: SeatIndex,
    chosen_suit: Option<Suit>,
) -> EffectResolution {
    let kind = state
        .discard
        .top_card()
        .map(Card::kind)
        .unwrap_or(CardKind::Regular);

    let mut resolution = EffectResolution::default();
    match kind {
        CardKind::Regular => {}
        CardKind::SkipNext => {
            state.skip_next = true;
        }
        CardKind::ForceDraw => {
            state.pending_sevens = true;
            state.seven_stack += PENALTY_STEP;
            resolution.events.push(GameEvent::PenaltyRaised {
                seat,
                total: state.seven_stack,
            });
        }
        CardKind::ChooseSuit => match chosen_suit {
            Some(suit) => resolution.events.push(apply_suit_choice(state, seat, suit)),
            None => {
                state.phase = MatchPhase::AwaitingSuitChoice;
                resolution.events.push(GameEvent::SuitChoiceRequested { seat });
                resolution.suspended = true;
            }
        },
    }

    for event in &resolution.events {
        state.record_event(event.clone());
    }
    resolution
}

/// 把换色结果写到弃牌堆顶的皇后上并约束下一手。
/// `chosen_suit` 在一次打出周期内只写一次。
pub fn apply_suit_choice(state: &mut MatchState, seat: SeatIndex, suit: Suit) -> GameEvent {
    if let Some(top) = state.discard.top_card_mut() {
        if top.chosen_suit.is_none() {
            top.chosen_suit = Some(suit);
        }
    }
    state.forced_suit = Some(suit);
    GameEvent::SuitChosen { seat, suit }
}
