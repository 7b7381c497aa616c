use tokio::sync::broadcast;

use crate::models::Opportunity;

/// Fire-and-forget hook invoked after an opportunity is stored.
/// Implementations must return promptly and never fail the caller.
pub trait OpportunityNotifier: Send + Sync {
    fn notify(&self, opportunity: &Opportunity);
}

/// Pushes new opportunities to any live subscribers.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Opportunity>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Opportunity> {
        self.tx.subscribe()
    }
}

impl OpportunityNotifier for BroadcastNotifier {
    fn notify(&self, opportunity: &Opportunity) {
        // No subscribers is not an error
        if self.tx.send(opportunity.clone()).is_err() {
            log::debug!("No live subscribers for opportunity {:?}", opportunity.id);
        }
    }
}

pub struct LogNotifier;

impl OpportunityNotifier for LogNotifier {
    fn notify(&self, o: &Opportunity) {
        log::info!(
            "New opportunity #{}: pair {} {} entry {} stop {} target {}",
            o.id.unwrap_or_default(),
            o.pair_id,
            o.signal,
            o.entry_price,
            o.stop_loss,
            o.take_profit
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Price, StopPrice, TargetPrice};
    use crate::models::SignalType;
    use chrono::Utc;

    #[tokio::test]
    async fn subscribers_receive_and_absent_subscribers_are_fine() {
        let notifier = BroadcastNotifier::new(8);
        let opp = Opportunity {
            id: Some(7),
            pair_id: 1,
            strategy_id: 1,
            consolidation_id: Some(3),
            signal: SignalType::Sell,
            entry_price: Price::new(1.0),
            stop_loss: StopPrice::new(1.005),
            take_profit: TargetPrice::new(0.99),
            created_at: Utc::now(),
            outcome: None,
        };

        // Nobody listening yet
        notifier.notify(&opp);

        let mut rx = notifier.subscribe();
        notifier.notify(&opp);
        assert_eq!(rx.recv().await.unwrap(), opp);
    }
}
