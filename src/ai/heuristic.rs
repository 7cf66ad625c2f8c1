use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{
    playable_cards, Card, CardId, CardKind, DrawAction, MatchState, PlayAction, SeatIndex, Suit,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameAction {
    PlayCard { action: PlayAction },
    Draw { action: DrawAction },
}

/// 策略阶梯里实际命中的分支，随决策一起回传给展示层。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DecisionReason {
    ChainPenalty,
    PayPenalty,
    NoPlayableCard,
    PushForWin,
    Defensive,
    HoldSpecials,
}

/// 思考延迟窗口，纯粹的节奏装饰，不影响决策本身。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiConfig {
    pub think_min_ms: u32,
    pub think_max_ms: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            think_min_ms: 800,
            think_max_ms: 1200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub action: GameAction,
    pub reason: DecisionReason,
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// 抽一个本回合的思考时长，只有这里消耗随机性。
    pub fn think_delay_ms(&mut self) -> u32 {
        let AiConfig {
            think_min_ms,
            think_max_ms,
        } = self.config;
        if think_max_ms <= think_min_ms {
            think_min_ms
        } else {
            self.rng.gen_range(think_min_ms..=think_max_ms)
        }
    }

    /// 为当前座位算出一步行动；决策完全由状态决定。
    /// 优先级从上到下：续打七、认罚抽牌、无牌可出则摸牌、
    /// 快赢时先出普通牌、对手快赢时打压制牌、否则攒着特殊牌。
    pub fn decide_action(&self, state: &MatchState, seat: SeatIndex) -> Option<AiDecision> {
        if state.is_finished() || state.current != seat {
            return None;
        }
        let participant = state.participant(seat)?;
        if !participant.is_automated() {
            return None;
        }
        let hand = &participant.hand;

        if state.pending_sevens {
            if let Some(seven) = hand.iter().find(|c| c.kind() == CardKind::ForceDraw) {
                return Some(AiDecision {
                    action: Self::play(seat, seven.id, None),
                    reason: DecisionReason::ChainPenalty,
                });
            }
            return Some(AiDecision {
                action: Self::draw(seat),
                reason: DecisionReason::PayPenalty,
            });
        }

        let playable = playable_cards(state, hand);
        if playable.is_empty() {
            return Some(AiDecision {
                action: Self::draw(seat),
                reason: DecisionReason::NoPlayableCard,
            });
        }

        let mut pick: Option<(&Card, DecisionReason)> = None;
        if hand.len() <= 2 {
            pick = playable
                .iter()
                .find(|c| !c.is_special())
                .map(|c| (*c, DecisionReason::PushForWin));
        }
        if pick.is_none() && Self::opponent_close_to_winning(state, seat) {
            pick = playable
                .iter()
                .find(|c| c.kind() == CardKind::ForceDraw)
                .or_else(|| playable.iter().find(|c| c.kind() == CardKind::SkipNext))
                .map(|c| (*c, DecisionReason::Defensive));
        }
        if pick.is_none() {
            pick = playable
                .iter()
                .find(|c| !c.is_special())
                .map(|c| (*c, DecisionReason::HoldSpecials));
        }
        let (card, reason) = pick.unwrap_or((playable[0], DecisionReason::HoldSpecials));

        let chosen_suit = if card.kind() == CardKind::ChooseSuit {
            Some(Self::preferred_suit(hand, card.id))
        } else {
            None
        };

        Some(AiDecision {
            action: GameAction::PlayCard {
                action: PlayAction {
                    seat,
                    card_id: card.id,
                    chosen_suit,
                },
            },
            reason,
        })
    }

    /// 出皇后时选手里剩牌最多的花色；平局按花色声明顺序取先者。
    pub fn preferred_suit(hand: &[Card], exclude: CardId) -> Suit {
        let mut best = Suit::ALL[0];
        let mut best_count = 0usize;
        for suit in Suit::ALL {
            let count = hand
                .iter()
                .filter(|c| c.id != exclude && c.suit == suit)
                .count();
            if count > best_count {
                best_count = count;
                best = suit;
            }
        }
        best
    }

    fn opponent_close_to_winning(state: &MatchState, seat: SeatIndex) -> bool {
        state
            .participants
            .iter()
            .any(|p| p.seat != seat && p.hand_size() <= 2)
    }

    fn play(seat: SeatIndex, card_id: CardId, chosen_suit: Option<Suit>) -> GameAction {
        GameAction::PlayCard {
            action: PlayAction {
                seat,
                card_id,
                chosen_suit,
            },
        }
    }

    fn draw(seat: SeatIndex) -> GameAction {
        GameAction::Draw {
            action: DrawAction { seat },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DeckVariant, MatchPhase, Rank};

    fn card(id: CardId, suit: Suit, rank: Rank) -> Card {
        Card::new(id, suit, rank)
    }

    fn state_with(hands: Vec<Vec<Card>>, top: Card) -> MatchState {
        let seats = hands.len() as u8;
        let mut state = MatchState::new(DeckVariant::Standard, seats);
        for (index, hand) in hands.into_iter().enumerate() {
            state.participants[index].hand = hand;
        }
        state.discard.place(top);
        state.phase = MatchPhase::AwaitingAction;
        state.current = 1;
        state
    }

    fn agent() -> AiAgent {
        AiAgent::with_seed(AiConfig::default(), 1)
    }

    fn played_card(decision: &AiDecision) -> CardId {
        match &decision.action {
            GameAction::PlayCard { action } => action.card_id,
            GameAction::Draw { .. } => panic!("expected a play, got a draw"),
        }
    }

    #[test]
    fn chains_a_seven_while_the_penalty_is_pending() {
        let mut state = state_with(
            vec![
                vec![card(10, Suit::Clubs, Rank::King)],
                vec![
                    card(1, Suit::Hearts, Rank::Seven),
                    card(2, Suit::Spades, Rank::Nine),
                ],
            ],
            card(99, Suit::Spades, Rank::Seven),
        );
        state.pending_sevens = true;
        state.seven_stack = 2;

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert_eq!(played_card(&decision), 1);
        assert_eq!(decision.reason, DecisionReason::ChainPenalty);
    }

    #[test]
    fn pays_the_penalty_when_no_seven_is_in_hand() {
        let mut state = state_with(
            vec![
                vec![card(10, Suit::Clubs, Rank::King)],
                vec![
                    card(1, Suit::Hearts, Rank::Nine),
                    card(2, Suit::Spades, Rank::King),
                ],
            ],
            card(99, Suit::Spades, Rank::Seven),
        );
        state.pending_sevens = true;
        state.seven_stack = 4;

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert!(matches!(decision.action, GameAction::Draw { .. }));
        assert_eq!(decision.reason, DecisionReason::PayPenalty);
    }

    #[test]
    fn draws_when_nothing_is_playable() {
        let state = state_with(
            vec![
                vec![card(10, Suit::Clubs, Rank::King)],
                vec![
                    card(1, Suit::Spades, Rank::Eight),
                    card(2, Suit::Clubs, Rank::King),
                ],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert!(matches!(decision.action, GameAction::Draw { .. }));
        assert_eq!(decision.reason, DecisionReason::NoPlayableCard);
    }

    #[test]
    fn prefers_a_regular_card_when_close_to_winning() {
        let state = state_with(
            vec![
                vec![
                    card(10, Suit::Clubs, Rank::King),
                    card(11, Suit::Clubs, Rank::Nine),
                    card(12, Suit::Diamonds, Rank::Ten),
                ],
                vec![
                    card(1, Suit::Hearts, Rank::Ace),
                    card(2, Suit::Hearts, Rank::Nine),
                ],
            ],
            card(99, Suit::Hearts, Rank::King),
        );

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert_eq!(played_card(&decision), 2, "the regular heart goes first");
        assert_eq!(decision.reason, DecisionReason::PushForWin);
    }

    #[test]
    fn plays_a_seven_defensively_when_an_opponent_is_low() {
        let state = state_with(
            vec![
                vec![
                    card(10, Suit::Clubs, Rank::King),
                    card(11, Suit::Diamonds, Rank::Ten),
                ],
                vec![
                    card(1, Suit::Hearts, Rank::Seven),
                    card(2, Suit::Hearts, Rank::Eight),
                    card(3, Suit::Spades, Rank::King),
                ],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert_eq!(played_card(&decision), 1, "the seven hits the leader");
        assert_eq!(decision.reason, DecisionReason::Defensive);
    }

    #[test]
    fn hoards_special_cards_when_nothing_is_urgent() {
        let state = state_with(
            vec![
                vec![
                    card(10, Suit::Clubs, Rank::King),
                    card(11, Suit::Diamonds, Rank::Ten),
                    card(12, Suit::Diamonds, Rank::Nine),
                ],
                vec![
                    card(1, Suit::Hearts, Rank::Ace),
                    card(2, Suit::Hearts, Rank::Eight),
                    card(3, Suit::Spades, Rank::King),
                ],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert_eq!(played_card(&decision), 2, "the ace stays in hand");
        assert_eq!(decision.reason, DecisionReason::HoldSpecials);
    }

    #[test]
    fn a_forced_queen_carries_the_preferred_suit() {
        let state = state_with(
            vec![
                vec![
                    card(10, Suit::Clubs, Rank::King),
                    card(11, Suit::Diamonds, Rank::Ten),
                    card(12, Suit::Diamonds, Rank::Nine),
                ],
                vec![
                    card(1, Suit::Clubs, Rank::Queen),
                    card(2, Suit::Spades, Rank::King),
                    card(3, Suit::Spades, Rank::Jack),
                ],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        match decision.action {
            GameAction::PlayCard { action } => {
                assert_eq!(action.card_id, 1);
                assert_eq!(action.chosen_suit, Some(Suit::Spades));
            }
            GameAction::Draw { .. } => panic!("expected the queen to be played"),
        }
    }

    #[test]
    fn respects_a_forced_suit_from_an_earlier_queen() {
        let mut state = state_with(
            vec![
                vec![
                    card(10, Suit::Clubs, Rank::King),
                    card(11, Suit::Diamonds, Rank::Ten),
                    card(12, Suit::Diamonds, Rank::Nine),
                ],
                vec![
                    card(1, Suit::Hearts, Rank::Nine),
                    card(2, Suit::Clubs, Rank::Nine),
                ],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );
        state.forced_suit = Some(Suit::Clubs);

        let decision = agent().decide_action(&state, 1).expect("decision expected");
        assert_eq!(
            played_card(&decision),
            2,
            "only the club matches the forced suit, rank match does not count"
        );
    }

    #[test]
    fn suit_preference_counts_the_remaining_hand() {
        let hand = vec![
            card(1, Suit::Clubs, Rank::Queen),
            card(2, Suit::Spades, Rank::King),
            card(3, Suit::Spades, Rank::Jack),
            card(4, Suit::Diamonds, Rank::Nine),
        ];
        assert_eq!(AiAgent::preferred_suit(&hand, 1), Suit::Spades);

        let tied = vec![
            card(1, Suit::Clubs, Rank::Queen),
            card(2, Suit::Spades, Rank::King),
            card(3, Suit::Diamonds, Rank::Nine),
        ];
        assert_eq!(
            AiAgent::preferred_suit(&tied, 1),
            Suit::Diamonds,
            "ties fall back to the declaration order"
        );

        let lonely = vec![card(1, Suit::Clubs, Rank::Queen)];
        assert_eq!(AiAgent::preferred_suit(&lonely, 1), Suit::Hearts);
    }

    #[test]
    fn stays_silent_for_human_seats_and_out_of_turn_queries() {
        let state = state_with(
            vec![
                vec![card(10, Suit::Hearts, Rank::King)],
                vec![card(1, Suit::Hearts, Rank::Nine)],
            ],
            card(99, Suit::Hearts, Rank::Nine),
        );

        let agent = agent();
        assert!(agent.decide_action(&state, 0).is_none(), "seat 0 is human");
        let mut human_turn = state.clone();
        human_turn.current = 0;
        assert!(
            agent.decide_action(&human_turn, 1).is_none(),
            "seat 1 is not on turn"
        );
    }
}
