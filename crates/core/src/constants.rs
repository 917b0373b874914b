/// Currency the HNLD balance unit is pegged to
pub const PEG_CURRENCY: &str = "HNL";

/// Balance unit code shown to users
pub const HNLD_SYMBOL: &str = "HNLD";

/// Decimal precision for HNLD amounts
pub const HNLD_DECIMAL_PRECISION: u32 = 2;

/// Decimal precision for platform exchange rates
pub const RATE_DECIMAL_PRECISION: u32 = 4;

/// Buffer size of each realtime subscription channel
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// Table names used by the hosted backend
pub mod tables {
    pub const PURCHASE_REQUESTS: &str = "purchase_requests";
    pub const SALE_REQUESTS: &str = "sale_requests";
    pub const PREDICTION_MARKETS: &str = "prediction_markets";
    pub const MARKET_BETS: &str = "prediction_bets";
    pub const CHAT_CONVERSATIONS: &str = "chat_conversations";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const TYPING_STATUS: &str = "chat_typing_status";
    pub const HNLD_BALANCES: &str = "hnld_balances";
}
