use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{
    BalanceRepositoryTrait, ChatRepositoryTrait, MarketRepositoryTrait,
    TradeRequestRepositoryTrait,
};
use crate::balances::HnldBalance;
use crate::chat::{ChatMessage, Conversation, NewChatMessage, TypingStatus};
use crate::constants::{tables, SUBSCRIPTION_BUFFER};
use crate::errors::{BackendError, Error, Result, ValidationError};
use crate::markets::{
    estimate_payout, Bet, MarketOutcome, MarketStatus, NewBet, NewMarket, PredictionMarket,
};
use crate::mutations::Validate;
use crate::realtime::{
    ChannelFilter, ChannelStatus, FeedMessage, Identified, RawChangeEvent, RealtimeError,
    RealtimeFeed, Subscription,
};
use crate::requests::{
    make_request_code, NewTradeRequest, RequestKind, RequestStatus, TradeRequest,
};

const FAN_OUT_CAPACITY: usize = 1024;

#[derive(Default)]
struct State {
    requests: Vec<TradeRequest>,
    markets: Vec<PredictionMarket>,
    bets: Vec<Bet>,
    conversations: Vec<Conversation>,
    messages: Vec<ChatMessage>,
    typing: HashMap<String, TypingStatus>,
    balances: HashMap<String, HnldBalance>,
}

/// Backend stand-in that keeps rows in memory and fans out change events.
///
/// Remote functions keep the hosted backend's rules: status machines are
/// enforced, bets check and reserve balance, and every write emits the
/// change event subscribers would see.
pub struct InMemoryBackend {
    state: RwLock<State>,
    events: broadcast::Sender<FeedMessage>,
    unavailable: AtomicBool,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(FAN_OUT_CAPACITY);
        Self {
            state: RwLock::new(State::default()),
            events,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every call fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Pushes a raw event to subscribers without touching stored rows.
    pub fn emit_raw(&self, event: RawChangeEvent) {
        let _ = self.events.send(FeedMessage::Change(event));
    }

    /// Reports a channel status to every open subscription.
    pub fn fail_channel(&self, status: ChannelStatus) {
        let _ = self.events.send(FeedMessage::Status(status));
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn seed_balance(&self, balance: HnldBalance) -> Result<()> {
        self.write()?
            .balances
            .insert(balance.user_id.clone(), balance);
        Ok(())
    }

    pub fn seed_request(&self, request: TradeRequest) -> Result<()> {
        self.write()?.requests.push(request);
        Ok(())
    }

    pub fn seed_market(&self, market: PredictionMarket) -> Result<()> {
        self.write()?.markets.push(market);
        Ok(())
    }

    pub fn seed_conversation(&self, conversation: Conversation) -> Result<()> {
        self.write()?.conversations.push(conversation);
        Ok(())
    }

    fn ensure_available(&self, function: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(format!(
                "{} could not reach the backend",
                function
            ))
            .into());
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::Unexpected("backend state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::Unexpected("backend state lock poisoned".to_string()))
    }

    fn emit_insert<T: Serialize>(&self, table: &str, row: &T) -> Result<()> {
        self.emit_raw(RawChangeEvent::insert(table, serde_json::to_value(row)?));
        Ok(())
    }

    fn emit_update<T: Serialize>(&self, table: &str, previous: &T, row: &T) -> Result<()> {
        self.emit_raw(RawChangeEvent::update_from(
            table,
            serde_json::to_value(previous)?,
            serde_json::to_value(row)?,
        ));
        Ok(())
    }

    fn emit_delete(&self, table: &str, id: &str) {
        self.emit_raw(RawChangeEvent::delete(table, id));
    }
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl TradeRequestRepositoryTrait for InMemoryBackend {
    async fn list_requests(&self, kind: RequestKind) -> Result<Vec<TradeRequest>> {
        self.ensure_available("list_requests")?;
        let state = self.read()?;
        Ok(newest_first(
            state.requests.iter().filter(|r| r.kind == kind).cloned(),
        ))
    }

    async fn get_request(&self, kind: RequestKind, id: &str) -> Result<TradeRequest> {
        self.ensure_available("get_request")?;
        self.read()?
            .requests
            .iter()
            .find(|r| r.kind == kind && r.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(TradeRequest::ENTITY, id))
    }

    async fn create_request(
        &self,
        owner_id: &str,
        new_request: NewTradeRequest,
    ) -> Result<TradeRequest> {
        self.ensure_available("create_request")?;
        new_request.validate()?;
        let id = Uuid::new_v4();
        let request = TradeRequest {
            id: id.to_string(),
            kind: new_request.kind,
            owner_id: owner_id.to_string(),
            amount: new_request.amount,
            currency: new_request.currency.trim().to_uppercase(),
            payment_method: new_request.payment_method,
            status: RequestStatus::Active,
            code: make_request_code(new_request.kind, &id),
            expires_at: new_request.expires_at,
            created_at: Utc::now(),
        };
        {
            let mut state = self.write()?;
            if state.requests.iter().any(|r| r.code == request.code) {
                return Err(BackendError::UniqueViolation(format!(
                    "request code {} already exists",
                    request.code
                ))
                .into());
            }
            state.requests.push(request.clone());
        }
        self.emit_insert(request.kind.table(), &request)?;
        Ok(request)
    }

    async fn update_request_status(
        &self,
        kind: RequestKind,
        id: &str,
        status: RequestStatus,
    ) -> Result<TradeRequest> {
        self.ensure_available("update_request_status")?;
        let updated = {
            let mut state = self.write()?;
            let request = state
                .requests
                .iter_mut()
                .find(|r| r.kind == kind && r.id == id)
                .ok_or_else(|| Error::not_found(TradeRequest::ENTITY, id))?;
            if !request.status.can_transition_to(status) {
                return Err(Error::InvalidTransition {
                    entity: TradeRequest::ENTITY,
                    id: id.to_string(),
                    from: request.status.as_str().to_string(),
                    to: status.as_str().to_string(),
                });
            }
            let previous = request.clone();
            request.status = status;
            (previous, request.clone())
        };
        let (previous, updated) = updated;
        self.emit_update(kind.table(), &previous, &updated)?;
        Ok(updated)
    }

    async fn delete_request(&self, kind: RequestKind, id: &str) -> Result<()> {
        self.ensure_available("delete_request")?;
        {
            let mut state = self.write()?;
            let before = state.requests.len();
            state.requests.retain(|r| !(r.kind == kind && r.id == id));
            if state.requests.len() == before {
                return Err(Error::not_found(TradeRequest::ENTITY, id));
            }
        }
        self.emit_delete(kind.table(), id);
        Ok(())
    }
}

#[async_trait]
impl MarketRepositoryTrait for InMemoryBackend {
    async fn list_markets(&self) -> Result<Vec<PredictionMarket>> {
        self.ensure_available("list_markets")?;
        Ok(newest_first(self.read()?.markets.iter().cloned()))
    }

    async fn get_market(&self, id: &str) -> Result<PredictionMarket> {
        self.ensure_available("get_market")?;
        self.read()?
            .markets
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| Error::not_found(PredictionMarket::ENTITY, id))
    }

    async fn create_market(
        &self,
        creator_id: &str,
        new_market: NewMarket,
    ) -> Result<PredictionMarket> {
        self.ensure_available("create_market")?;
        new_market.validate()?;
        let outcomes = new_market
            .outcome_labels
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(|label| MarketOutcome {
                id: Uuid::new_v4().to_string(),
                label: label.to_string(),
                pool: Decimal::ZERO,
            })
            .collect();
        let market = PredictionMarket {
            id: Uuid::new_v4().to_string(),
            creator_id: creator_id.to_string(),
            question: new_market.question.trim().to_string(),
            outcomes,
            status: MarketStatus::Active,
            winning_outcome_id: None,
            total_pool: Decimal::ZERO,
            created_at: Utc::now(),
        };
        self.write()?.markets.push(market.clone());
        self.emit_insert(tables::PREDICTION_MARKETS, &market)?;
        Ok(market)
    }

    async fn set_market_status(&self, id: &str, status: MarketStatus) -> Result<PredictionMarket> {
        self.ensure_available("set_market_status")?;
        if status == MarketStatus::Resolved {
            return Err(ValidationError::InvalidInput(
                "resolving a market requires a winning outcome".to_string(),
            )
            .into());
        }
        let updated = {
            let mut state = self.write()?;
            let market = state
                .markets
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| Error::not_found(PredictionMarket::ENTITY, id))?;
            ensure_market_transition(market, status)?;
            let previous = market.clone();
            market.status = status;
            (previous, market.clone())
        };
        let (previous, updated) = updated;
        self.emit_update(tables::PREDICTION_MARKETS, &previous, &updated)?;
        Ok(updated)
    }

    async fn resolve_market(&self, id: &str, winning_outcome_id: &str) -> Result<PredictionMarket> {
        self.ensure_available("resolve_market")?;
        let updated = {
            let mut state = self.write()?;
            let market = state
                .markets
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or_else(|| Error::not_found(PredictionMarket::ENTITY, id))?;
            ensure_market_transition(market, MarketStatus::Resolved)?;
            let mut resolved = market.clone();
            resolved.status = MarketStatus::Resolved;
            resolved.winning_outcome_id = Some(winning_outcome_id.to_string());
            resolved.validate()?;
            let previous = std::mem::replace(market, resolved.clone());
            (previous, resolved)
        };
        let (previous, updated) = updated;
        log::info!("Market {} resolved, winner {}", id, winning_outcome_id);
        self.emit_update(tables::PREDICTION_MARKETS, &previous, &updated)?;
        Ok(updated)
    }

    async fn delete_market(&self, id: &str) -> Result<()> {
        self.ensure_available("delete_market")?;
        {
            let mut state = self.write()?;
            let before = state.markets.len();
            state.markets.retain(|m| m.id != id);
            if state.markets.len() == before {
                return Err(Error::not_found(PredictionMarket::ENTITY, id));
            }
        }
        self.emit_delete(tables::PREDICTION_MARKETS, id);
        Ok(())
    }

    async fn list_bets(&self, user_id: &str) -> Result<Vec<Bet>> {
        self.ensure_available("list_bets")?;
        let state = self.read()?;
        Ok(newest_first(
            state.bets.iter().filter(|b| b.user_id == user_id).cloned(),
        ))
    }

    async fn place_bet(&self, user_id: &str, new_bet: NewBet) -> Result<Bet> {
        self.ensure_available("place_bet")?;
        new_bet.validate()?;
        let (bet, (previous_market, market), (previous_balance, balance)) = {
            let mut state = self.write()?;
            let available = state
                .balances
                .get(user_id)
                .map(|b| b.available)
                .unwrap_or(Decimal::ZERO);
            if available < new_bet.amount {
                return Err(Error::InsufficientBalance {
                    requested: new_bet.amount.to_string(),
                    available: available.to_string(),
                });
            }

            let market = state
                .markets
                .iter_mut()
                .find(|m| m.id == new_bet.market_id)
                .ok_or_else(|| Error::not_found(PredictionMarket::ENTITY, &new_bet.market_id))?;
            if !market.status.accepts_bets() {
                return Err(ValidationError::InvalidInput(format!(
                    "market is {} and no longer accepts bets",
                    market.status.as_str()
                ))
                .into());
            }
            let potential_payout = estimate_payout(market, &new_bet.outcome_id, new_bet.amount)
                .ok_or_else(|| {
                    ValidationError::InvalidInput(format!(
                        "unknown outcome {}",
                        new_bet.outcome_id
                    ))
                })?;
            let previous_market = market.clone();
            if let Some(outcome) = market
                .outcomes
                .iter_mut()
                .find(|o| o.id == new_bet.outcome_id)
            {
                outcome.pool += new_bet.amount;
            }
            market.recompute_total_pool();
            let market = (previous_market, market.clone());

            let bet = Bet {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                market_id: new_bet.market_id.clone(),
                outcome_id: new_bet.outcome_id.clone(),
                amount: new_bet.amount,
                potential_payout,
                placed_at: Utc::now(),
            };
            state.bets.push(bet.clone());

            let balance = match state.balances.get_mut(user_id) {
                Some(balance) => {
                    let previous = balance.clone();
                    balance.available -= new_bet.amount;
                    balance.reserved += new_bet.amount;
                    balance.updated_at = Utc::now();
                    (previous, balance.clone())
                }
                None => return Err(Error::not_found(HnldBalance::ENTITY, user_id)),
            };
            (bet, market, balance)
        };
        log::debug!(
            "Bet {} placed on market {} for {}",
            bet.id,
            bet.market_id,
            bet.amount
        );
        self.emit_insert(tables::MARKET_BETS, &bet)?;
        self.emit_update(tables::PREDICTION_MARKETS, &previous_market, &market)?;
        self.emit_update(tables::HNLD_BALANCES, &previous_balance, &balance)?;
        Ok(bet)
    }
}

fn ensure_market_transition(market: &PredictionMarket, next: MarketStatus) -> Result<()> {
    if market.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            entity: PredictionMarket::ENTITY,
            id: market.id.clone(),
            from: market.status.as_str().to_string(),
            to: next.as_str().to_string(),
        })
    }
}

#[async_trait]
impl ChatRepositoryTrait for InMemoryBackend {
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        self.ensure_available("list_conversations")?;
        let state = self.read()?;
        Ok(newest_first(
            state
                .conversations
                .iter()
                .filter(|c| c.includes(user_id))
                .cloned(),
        ))
    }

    async fn open_conversation(
        &self,
        user_id: &str,
        counterpart_id: &str,
    ) -> Result<Conversation> {
        self.ensure_available("open_conversation")?;
        if user_id == counterpart_id {
            return Err(ValidationError::InvalidInput(
                "cannot open a conversation with yourself".to_string(),
            )
            .into());
        }
        let conversation = {
            let mut state = self.write()?;
            if let Some(existing) = state
                .conversations
                .iter()
                .find(|c| c.includes(user_id) && c.includes(counterpart_id))
            {
                return Ok(existing.clone());
            }
            let conversation = Conversation {
                id: Uuid::new_v4().to_string(),
                participant_ids: [user_id.to_string(), counterpart_id.to_string()],
                request_id: None,
                created_at: Utc::now(),
            };
            state.conversations.push(conversation.clone());
            conversation
        };
        self.emit_insert(tables::CHAT_CONVERSATIONS, &conversation)?;
        Ok(conversation)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.ensure_available("list_messages")?;
        let state = self.read()?;
        if !state.conversations.iter().any(|c| c.id == conversation_id) {
            return Err(Error::not_found(Conversation::ENTITY, conversation_id));
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn send_message(&self, sender_id: &str, message: NewChatMessage) -> Result<ChatMessage> {
        self.ensure_available("send_message")?;
        message.validate()?;
        let sent = {
            let mut state = self.write()?;
            let conversation = state
                .conversations
                .iter()
                .find(|c| c.id == message.conversation_id)
                .ok_or_else(|| Error::not_found(Conversation::ENTITY, &message.conversation_id))?;
            if !conversation.includes(sender_id) {
                return Err(BackendError::PermissionDenied(format!(
                    "{} is not part of conversation {}",
                    sender_id, conversation.id
                ))
                .into());
            }
            let sent = ChatMessage {
                id: Uuid::new_v4().to_string(),
                conversation_id: message.conversation_id.clone(),
                sender_id: sender_id.to_string(),
                body: message.body.trim().to_string(),
                sent_at: Utc::now(),
            };
            state.messages.push(sent.clone());
            sent
        };
        self.emit_insert(tables::CHAT_MESSAGES, &sent)?;
        Ok(sent)
    }

    async fn set_typing(
        &self,
        conversation_id: &str,
        user_id: &str,
        is_typing: bool,
    ) -> Result<TypingStatus> {
        self.ensure_available("set_typing")?;
        let status = TypingStatus::new(conversation_id, user_id, is_typing);
        let previous = self
            .write()?
            .typing
            .insert(status.id.clone(), status.clone());
        if let Some(previous) = previous {
            self.emit_update(tables::TYPING_STATUS, &previous, &status)?;
        } else {
            self.emit_insert(tables::TYPING_STATUS, &status)?;
        }
        Ok(status)
    }
}

#[async_trait]
impl BalanceRepositoryTrait for InMemoryBackend {
    async fn get_balance(&self, user_id: &str) -> Result<HnldBalance> {
        self.ensure_available("get_balance")?;
        self.read()?
            .balances
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::not_found(HnldBalance::ENTITY, user_id))
    }
}

#[async_trait]
impl RealtimeFeed for InMemoryBackend {
    async fn subscribe(
        &self,
        filter: ChannelFilter,
    ) -> std::result::Result<Subscription, RealtimeError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RealtimeError::SubscribeFailed {
                table: filter.table.clone(),
                message: "backend unavailable".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tx.try_send(FeedMessage::Status(ChannelStatus::Subscribed))
            .map_err(|_| RealtimeError::ChannelClosed)?;

        let mut feed = self.events.subscribe();
        let channel = filter.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = tx.closed() => break,
                    received = feed.recv() => received,
                };
                let forward = match message {
                    Ok(FeedMessage::Change(event)) if channel.matches(&event) => {
                        FeedMessage::Change(event)
                    }
                    Ok(FeedMessage::Change(_)) => continue,
                    Ok(status @ FeedMessage::Status(_)) => status,
                    Err(RecvError::Lagged(missed)) => {
                        log::warn!("{} lagged behind by {} events", channel.topic(), missed);
                        FeedMessage::Status(ChannelStatus::ChannelError(format!(
                            "missed {} events",
                            missed
                        )))
                    }
                    Err(RecvError::Closed) => {
                        let _ = tx.send(FeedMessage::Status(ChannelStatus::Closed)).await;
                        break;
                    }
                };
                if tx.send(forward).await.is_err() {
                    break;
                }
            }
            log::debug!("Forwarder for {} stopped", channel.topic());
        });

        log::debug!("Subscribed to {}", filter.topic());
        Ok(Subscription::new(filter, rx))
    }
}
