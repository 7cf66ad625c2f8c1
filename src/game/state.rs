use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use super::effects::CardKind;

/// 全局唯一的卡牌标识。
pub type CardId = u32;
/// 座位标识（0 号为人类玩家）。
pub type SeatIndex = u8;

const DEAL_ROUNDS: usize = 4;

/// 花色，声明顺序同时是换色平局时的优先顺序。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Hearts,
    Diamonds,
    Spades,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Spades, Suit::Clubs];
}

impl FromStr for Suit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hearts" | "♥" => Ok(Suit::Hearts),
            "diamonds" | "♦" => Ok(Suit::Diamonds),
            "spades" | "♠" => Ok(Suit::Spades),
            "clubs" | "♣" => Ok(Suit::Clubs),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Rank {
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

/// 牌组配置：标准 32 张，或调试用的 5 张单花色牌组。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeckVariant {
    Standard,
    Custom,
}

impl DeckVariant {
    pub fn suits(&self) -> &'static [Suit] {
        match self {
            DeckVariant::Standard => &Suit::ALL,
            DeckVariant::Custom => &[Suit::Spades],
        }
    }

    pub fn ranks(&self) -> &'static [Rank] {
        match self {
            DeckVariant::Standard => &[
                Rank::Seven,
                Rank::Eight,
                Rank::Nine,
                Rank::Ten,
                Rank::Jack,
                Rank::Queen,
                Rank::King,
                Rank::Ace,
            ],
            DeckVariant::Custom => &[Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace],
        }
    }

    pub fn card_total(&self) -> usize {
        self.suits().len() * self.ranks().len()
    }
}

impl Default for DeckVariant {
    fn default() -> Self {
        DeckVariant::Standard
    }
}

impl FromStr for DeckVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(DeckVariant::Standard),
            "custom" => Ok(DeckVariant::Custom),
            _ => Err(()),
        }
    }
}

/// 一张牌。花色与点数在构造后不可变，`chosen_suit` 仅对皇后有意义。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Rank,
    #[serde(default)]
    pub face_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_suit: Option<Suit>,
}

impl Card {
    pub fn new(id: CardId, suit: Suit, rank: Rank) -> Self {
        Self {
            id,
            suit,
            rank,
            face_up: false,
            chosen_suit: None,
        }
    }

    pub fn kind(&self) -> CardKind {
        CardKind::of(self.rank)
    }

    pub fn is_special(&self) -> bool {
        self.kind().is_special()
    }
}

/// 抽牌堆。牌面朝下，`cards` 末尾为堆顶。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Deck {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn build(variant: DeckVariant, rng: &mut SmallRng) -> Self {
        let mut cards = Vec::with_capacity(variant.card_total());
        let mut next_id: CardId = 1;
        for suit in variant.suits() {
            for rank in variant.ranks() {
                cards.push(Card::new(next_id, *suit, *rank));
                next_id += 1;
            }
        }
        let mut deck = Self { cards };
        deck.shuffle(rng);
        deck
    }

    pub fn shuffle(&mut self, rng: &mut SmallRng) {
        self.cards.shuffle(rng);
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn return_to_bottom(&mut self, card: Card) {
        self.cards.insert(0, card);
    }

    /// 将弃牌堆的历史牌（不含顶牌）回收进抽牌堆并洗牌，返回回收张数。
    pub fn recycle(&mut self, discard: &mut DiscardPile, rng: &mut SmallRng) -> usize {
        let recovered = discard.take_history();
        if recovered.is_empty() {
            return 0;
        }
        let count = recovered.len();
        for mut card in recovered {
            card.face_up = false;
            card.chosen_suit = None;
            self.cards.push(card);
        }
        self.shuffle(rng);
        count
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// 弃牌堆：当前顶牌加历史牌序列（旧牌在前）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiscardPile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Card>,
}

impl DiscardPile {
    pub fn place(&mut self, mut card: Card) {
        if let Some(previous) = self.top.take() {
            self.history.push(previous);
        }
        card.face_up = true;
        self.top = Some(card);
    }

    pub fn top_card(&self) -> Option<&Card> {
        self.top.as_ref()
    }

    pub fn top_card_mut(&mut self) -> Option<&mut Card> {
        self.top.as_mut()
    }

    pub fn take_history(&mut self) -> Vec<Card> {
        std::mem::take(&mut self.history)
    }

    pub fn total(&self) -> usize {
        self.history.len() + usize::from(self.top.is_some())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Human,
    Automated,
}

/// 一个座位上的玩家，手牌只属于该玩家。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub seat: SeatIndex,
    pub kind: ParticipantKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hand: Vec<Card>,
}

impl Participant {
    pub fn new(seat: SeatIndex, kind: ParticipantKind) -> Self {
        Self {
            seat,
            kind,
            hand: Vec::new(),
        }
    }

    pub fn is_automated(&self) -> bool {
        self.kind == ParticipantKind::Automated
    }

    pub fn hand_index(&self, card_id: CardId) -> Option<usize> {
        self.hand.iter().position(|card| card.id == card_id)
    }

    pub fn receive(&mut self, mut card: Card) {
        card.face_up = self.kind == ParticipantKind::Human;
        self.hand.push(card);
    }

    pub fn hand_size(&self) -> usize {
        self.hand.len()
    }
}

/// 对局阶段。换色等待是人类出皇后后的显式挂起状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchPhase {
    NotStarted,
    AwaitingAction,
    AwaitingSuitChoice,
    Finished,
}

impl Default for MatchPhase {
    fn default() -> Self {
        MatchPhase::NotStarted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: SeatIndex,
}

/// 对局事件流，供展示层驱动动画与提示。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MatchStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        top_card: Option<CardId>,
    },
    CardDealt {
        seat: SeatIndex,
        card_id: CardId,
    },
    CardDrawn {
        seat: SeatIndex,
        card_id: CardId,
    },
    DeckRecycled {
        count: u32,
    },
    DeckExhausted {
        seat: SeatIndex,
    },
    CardPlayed {
        seat: SeatIndex,
        card_id: CardId,
    },
    SuitChoiceRequested {
        seat: SeatIndex,
    },
    SuitChosen {
        seat: SeatIndex,
        suit: Suit,
    },
    PenaltyRaised {
        seat: SeatIndex,
        total: u8,
    },
    PenaltyPaid {
        seat: SeatIndex,
        count: u8,
    },
    TurnSkipped {
        seat: SeatIndex,
    },
    TurnStarted {
        seat: SeatIndex,
    },
    MatchWon {
        winner: SeatIndex,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    CardCountMismatch { expected: usize, actual: usize },
    DuplicateCardId { card_id: CardId },
    SeatOutOfRange { seat: SeatIndex },
    PenaltyCounterMismatch { pending: bool, stack: u8 },
    ForcedSuitDuringPenalty,
}

/// 对局整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchState {
    pub variant: DeckVariant,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub deck: Deck,
    #[serde(default)]
    pub discard: DiscardPile,
    pub current: SeatIndex,
    pub phase: MatchPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_suit: Option<Suit>,
    #[serde(default)]
    pub pending_sevens: bool,
    #[serde(default)]
    pub seven_stack: u8,
    #[serde(default)]
    pub skip_next: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
}

impl MatchState {
    pub fn new(variant: DeckVariant, participant_count: u8) -> Self {
        let participants = (0..participant_count)
            .map(|seat| {
                let kind = if seat == 0 {
                    ParticipantKind::Human
                } else {
                    ParticipantKind::Automated
                };
                Participant::new(seat, kind)
            })
            .collect();

        Self {
            variant,
            participants,
            deck: Deck::default(),
            discard: DiscardPile::default(),
            current: 0,
            phase: MatchPhase::NotStarted,
            forced_suit: None,
            pending_sevens: false,
            seven_stack: 0,
            skip_next: false,
            event_log: Vec::new(),
            outcome: None,
        }
    }

    /// 建堆、发牌并翻开首张非特殊牌，进入待行动阶段。
    pub fn begin(&mut self, rng: &mut SmallRng) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.deck = Deck::build(self.variant, rng);

        let seats: Vec<SeatIndex> = self.participants.iter().map(|p| p.seat).collect();
        for _ in 0..DEAL_ROUNDS {
            for seat in &seats {
                if let Some(card) = self.deck.draw() {
                    let card_id = card.id;
                    if let Some(participant) = self.participant_mut(*seat) {
                        participant.receive(card);
                        events.push(GameEvent::CardDealt {
                            seat: *seat,
                            card_id,
                        });
                    }
                }
            }
        }

        // 开局顶牌不允许是特殊牌；牌堆可能只剩特殊牌，重抽次数以堆大小为上限
        let mut attempts = self.deck.len();
        let mut opening = self.deck.draw();
        while let Some(card) = opening.take() {
            if card.is_special() && attempts > 0 {
                attempts -= 1;
                self.deck.return_to_bottom(card);
                self.deck.shuffle(rng);
                opening = self.deck.draw();
            } else {
                opening = Some(card);
                break;
            }
        }

        let top_card = opening.as_ref().map(|card| card.id);
        if let Some(card) = opening {
            self.discard.place(card);
        }
        events.push(GameEvent::MatchStarted { top_card });

        self.phase = MatchPhase::AwaitingAction;
        for event in &events {
            self.event_log.push(event.clone());
        }
        events
    }

    pub fn participant(&self, seat: SeatIndex) -> Option<&Participant> {
        self.participants.iter().find(|p| p.seat == seat)
    }

    pub fn participant_mut(&mut self, seat: SeatIndex) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.seat == seat)
    }

    pub fn current_participant(&self) -> Option<&Participant> {
        self.participant(self.current)
    }

    pub fn human_seat(&self) -> Option<SeatIndex> {
        self.participants
            .iter()
            .find(|p| p.kind == ParticipantKind::Human)
            .map(|p| p.seat)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    /// 为指定座位摸一张牌；抽牌堆空时先回收弃牌历史再重试一次。
    pub fn draw_to_hand(&mut self, seat: SeatIndex, rng: &mut SmallRng) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut card = self.deck.draw();
        if card.is_none() {
            let count = self.deck.recycle(&mut self.discard, rng);
            if count > 0 {
                events.push(GameEvent::DeckRecycled {
                    count: count as u32,
                });
            }
            card = self.deck.draw();
        }

        match card {
            Some(card) => {
                let card_id = card.id;
                if let Some(participant) = self.participant_mut(seat) {
                    participant.receive(card);
                    events.push(GameEvent::CardDrawn { seat, card_id });
                }
            }
            None => events.push(GameEvent::DeckExhausted { seat }),
        }

        for event in &events {
            self.event_log.push(event.clone());
        }
        events
    }

    pub fn clear_penalty(&mut self) {
        self.pending_sevens = false;
        self.seven_stack = 0;
    }

    /// 结算胜者并终结对局；胜利事件只记录一次。
    pub fn declare_winner(&mut self, seat: SeatIndex) -> MatchOutcome {
        let outcome = MatchOutcome { winner: seat };
        if self.outcome.is_none() {
            self.record_event(GameEvent::MatchWon { winner: seat });
            self.outcome = Some(outcome.clone());
        }
        self.phase = MatchPhase::Finished;
        outcome
    }

    /// 轮转到下一座位；若有待生效的跳过，则中间座位整轮不行动。
    pub fn advance_turn(&mut self) -> Vec<GameEvent> {
        let count = self.participants.len() as SeatIndex;
        let mut events = Vec::new();
        if count == 0 {
            return events;
        }

        if self.skip_next {
            self.skip_next = false;
            let skipped = (self.current + 1) % count;
            self.current = (self.current + 2) % count;
            events.push(GameEvent::TurnSkipped { seat: skipped });
        } else {
            self.current = (self.current + 1) % count;
        }
        events.push(GameEvent::TurnStarted { seat: self.current });

        for event in &events {
            self.event_log.push(event.clone());
        }
        events
    }

    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self
                .participants
                .iter()
                .map(Participant::hand_size)
                .sum::<usize>()
            + self.discard.total()
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.phase != MatchPhase::NotStarted {
            let expected = self.variant.card_total();
            let actual = self.total_cards();
            if expected != actual {
                return Err(IntegrityError::CardCountMismatch { expected, actual });
            }
        }

        if !self.participants.iter().any(|p| p.seat == self.current) {
            return Err(IntegrityError::SeatOutOfRange { seat: self.current });
        }

        let mut seen = HashSet::new();
        let hands = self.participants.iter().flat_map(|p| p.hand.iter());
        let piles = self.deck.cards.iter().chain(self.discard.history.iter());
        for card in hands.chain(piles).chain(self.discard.top.iter()) {
            if !seen.insert(card.id) {
                return Err(IntegrityError::DuplicateCardId { card_id: card.id });
            }
        }

        if self.pending_sevens != (self.seven_stack > 0) {
            return Err(IntegrityError::PenaltyCounterMismatch {
                pending: self.pending_sevens,
                stack: self.seven_stack,
            });
        }
        if self.pending_sevens && self.forced_suit.is_some() {
            return Err(IntegrityError::ForcedSuitDuringPenalty);
        }

        Ok(())
    }
}
