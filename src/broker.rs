//! Order capability consumed by the executor, plus an in-memory paper broker.

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::types::{Order, OrderStatus, Side, StopConditions};

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: f64,
    pub side: Side,
    pub price: Option<f64>,
    pub stop_conditions: Option<StopConditions>,
}

pub trait Broker: Send {
    /// `None` when the broker refuses the order.
    fn submit_order(&mut self, req: OrderRequest) -> Option<Order>;
    fn get(&self, order_id: &str) -> Option<Order>;
    /// Returns false when the order is unknown or already done.
    fn close(&mut self, order_id: &str) -> bool;
    fn cancel(&mut self, order_id: &str) -> bool;
}

/// Fills everything immediately at the requested price; halted symbols are refused.
#[derive(Debug, Default)]
pub struct PaperBroker {
    orders: HashMap<String, Order>,
    halted: HashSet<String>,
    seq: u64,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&mut self, symbol: &str) {
        self.halted.insert(symbol.to_ascii_uppercase());
    }

    fn finish(&mut self, order_id: &str, to: OrderStatus) -> bool {
        match self.orders.get_mut(order_id) {
            Some(o) if o.status == OrderStatus::Open => {
                o.status = to;
                info!("Paper order {} -> {:?}", order_id, to);
                true
            }
            Some(_) => false,
            None => {
                warn!("Paper order {} not found", order_id);
                false
            }
        }
    }
}

impl Broker for PaperBroker {
    fn submit_order(&mut self, req: OrderRequest) -> Option<Order> {
        let symbol = req.symbol.to_ascii_uppercase();
        if self.halted.contains(&symbol) {
            warn!("Paper broker refused {} {}: symbol halted", req.side, symbol);
            return None;
        }
        self.seq += 1;
        let order = Order {
            order_id: format!("PB-{:06}", self.seq),
            symbol,
            side: req.side,
            quantity: req.quantity,
            price: req.price,
            status: OrderStatus::Open,
            stop_conditions: req.stop_conditions,
        };
        info!(
            "Paper order {} placed: {} {} x{} @ {:?}",
            order.order_id, order.side, order.symbol, order.quantity, order.price
        );
        self.orders.insert(order.order_id.clone(), order.clone());
        Some(order)
    }

    fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).cloned()
    }

    fn close(&mut self, order_id: &str) -> bool {
        self.finish(order_id, OrderStatus::Closed)
    }

    fn cancel(&mut self, order_id: &str) -> bool {
        self.finish(order_id, OrderStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(symbol: &str) -> OrderRequest {
        OrderRequest {
            symbol: symbol.into(),
            quantity: 5.0,
            side: Side::Buy,
            price: Some(10.0),
            stop_conditions: None,
        }
    }

    #[test]
    fn submit_close_once() {
        let mut b = PaperBroker::new();
        let o = b.submit_order(req("amd")).unwrap();
        assert_eq!(o.symbol, "AMD");
        assert!(b.close(&o.order_id));
        assert!(!b.close(&o.order_id));
        assert!(!b.cancel(&o.order_id));
        assert_eq!(b.get(&o.order_id).unwrap().status, OrderStatus::Closed);
    }

    #[test]
    fn halted_symbol_refused() {
        let mut b = PaperBroker::new();
        b.halt("gme");
        assert!(b.submit_order(req("GME")).is_none());
        assert!(!b.close("PB-000999"));
    }
}
