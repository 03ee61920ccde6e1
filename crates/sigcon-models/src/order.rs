use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::signal::TradeAction;

/// Order hand-off to the execution layer. The core never places orders
/// itself; it only produces these for whoever owns the broker connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub action: TradeAction,
    /// Notional amount in account currency.
    pub amount: Decimal,
    /// Limit price. None = market order.
    pub price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_order_json_shape() {
        let order = OrderRequest {
            symbol: "ETH".to_string(),
            action: TradeAction::Sell,
            amount: dec!(250.50),
            price: Some(dec!(3120.00)),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["action"], "SELL");
        assert_eq!(json["amount"], "250.50");
        assert_eq!(json["price"], "3120.00");
    }

    #[test]
    fn market_order_has_null_price() {
        let json = r#"{"symbol": "BTC", "action": "BUY", "amount": "100", "price": null}"#;
        let order: OrderRequest = serde_json::from_str(json).unwrap();
        assert!(order.price.is_none());
        assert_eq!(order.action, TradeAction::Buy);
    }
}
