use async_trait::async_trait;

use crate::balances::HnldBalance;
use crate::chat::{ChatMessage, Conversation, NewChatMessage, TypingStatus};
use crate::errors::Result;
use crate::markets::{Bet, MarketStatus, NewBet, NewMarket, PredictionMarket};
use crate::requests::{NewTradeRequest, RequestKind, RequestStatus, TradeRequest};

/// Purchase/sale request queries and remote functions.
#[async_trait]
pub trait TradeRequestRepositoryTrait: Send + Sync {
    async fn list_requests(&self, kind: RequestKind) -> Result<Vec<TradeRequest>>;
    async fn get_request(&self, kind: RequestKind, id: &str) -> Result<TradeRequest>;
    async fn create_request(&self, owner_id: &str, new_request: NewTradeRequest)
        -> Result<TradeRequest>;
    async fn update_request_status(
        &self,
        kind: RequestKind,
        id: &str,
        status: RequestStatus,
    ) -> Result<TradeRequest>;
    async fn delete_request(&self, kind: RequestKind, id: &str) -> Result<()>;
}

/// Prediction market queries and remote functions.
#[async_trait]
pub trait MarketRepositoryTrait: Send + Sync {
    async fn list_markets(&self) -> Result<Vec<PredictionMarket>>;
    async fn get_market(&self, id: &str) -> Result<PredictionMarket>;
    async fn create_market(&self, creator_id: &str, new_market: NewMarket)
        -> Result<PredictionMarket>;
    async fn set_market_status(&self, id: &str, status: MarketStatus) -> Result<PredictionMarket>;
    async fn resolve_market(&self, id: &str, winning_outcome_id: &str) -> Result<PredictionMarket>;
    async fn delete_market(&self, id: &str) -> Result<()>;
    async fn list_bets(&self, user_id: &str) -> Result<Vec<Bet>>;
    async fn place_bet(&self, user_id: &str, new_bet: NewBet) -> Result<Bet>;
}

/// Chat queries and typing indicators.
#[async_trait]
pub trait ChatRepositoryTrait: Send + Sync {
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;
    async fn open_conversation(&self, user_id: &str, counterpart_id: &str)
        -> Result<Conversation>;
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;
    async fn send_message(&self, sender_id: &str, message: NewChatMessage) -> Result<ChatMessage>;
    async fn set_typing(
        &self,
        conversation_id: &str,
        user_id: &str,
        is_typing: bool,
    ) -> Result<TypingStatus>;
}

/// Read access to HNLD balances.
#[async_trait]
pub trait BalanceRepositoryTrait: Send + Sync {
    async fn get_balance(&self, user_id: &str) -> Result<HnldBalance>;
}
