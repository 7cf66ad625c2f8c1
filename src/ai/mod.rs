//! AI 决策模块（自动座位的出牌策略与思考节奏）。

pub mod heuristic;

pub use heuristic::{AiAgent, AiConfig, AiDecision, DecisionReason, GameAction};
