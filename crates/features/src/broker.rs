//! Broker net-flow aggregation.
//!
//! Tallies bought and sold volume per broker code and ranks brokers by net
//! flow (bought - sold).

use std::collections::BTreeMap;
use ticksmith_core::{BrokerStat, Trade, Volume};
use ticksmith_ingestion::TradeLedger;

/// Per-broker accumulator.
#[derive(Debug, Clone, Default)]
struct BrokerTally {
    sold_volume: Volume,
    sold_trades: u64,
    bought_volume: Volume,
    bought_trades: u64,
}

impl BrokerTally {
    fn net(&self) -> i64 {
        self.bought_volume as i64 - self.sold_volume as i64
    }

    fn to_stat(&self, broker: &str) -> BrokerStat {
        let net = self.net();
        BrokerStat {
            rank: 0,
            broker: broker.to_string(),
            sold_volume: self.sold_volume,
            sold_trades: self.sold_trades,
            bought_volume: self.bought_volume,
            bought_trades: self.bought_trades,
            net,
            positive: net > 0,
        }
    }
}

/// Broker net-flow aggregator for one day.
#[derive(Debug, Clone, Default)]
pub struct BrokerNetter {
    /// Tallies keyed by broker code; ordering gives the tie-break.
    brokers: BTreeMap<String, BrokerTally>,
}

impl BrokerNetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net-flow table for a whole ledger.
    pub fn from_ledger(ledger: &TradeLedger) -> Vec<BrokerStat> {
        let mut netter = Self::new();
        netter.add_trades(ledger.trades());
        netter.table()
    }

    /// Add a trade to both sides' tallies. Blank broker codes are ignored.
    pub fn add_trade(&mut self, trade: &Trade) {
        if !trade.seller.trim().is_empty() {
            let tally = self.brokers.entry(trade.seller.clone()).or_default();
            tally.sold_volume += trade.volume;
            tally.sold_trades += 1;
        }
        if !trade.buyer.trim().is_empty() {
            let tally = self.brokers.entry(trade.buyer.clone()).or_default();
            tally.bought_volume += trade.volume;
            tally.bought_trades += 1;
        }
    }

    pub fn add_trades(&mut self, trades: &[Trade]) {
        for trade in trades {
            self.add_trade(trade);
        }
    }

    /// Brokers sorted by net flow, largest net buyer first. Ties keep
    /// ascending broker order.
    pub fn table(&self) -> Vec<BrokerStat> {
        let mut stats: Vec<BrokerStat> = self
            .brokers
            .iter()
            .map(|(broker, tally)| tally.to_stat(broker))
            .collect();

        stats.sort_by(|a, b| b.net.cmp(&a.net));
        for (rank, stat) in stats.iter_mut().enumerate() {
            stat.rank = rank;
        }
        stats
    }

    /// Number of brokers seen.
    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.brokers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_trade(buyer: &str, seller: &str, volume: Volume) -> Trade {
        Trade {
            time: NaiveDate::from_ymd_opt(2023, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            price: 100.0,
            volume,
            source: "Auto trade".to_string(),
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            initiator: String::new(),
            vwap: None,
        }
    }

    #[test]
    fn test_single_broker_pair() {
        let mut netter = BrokerNetter::new();
        netter.add_trade(&make_trade("DNB", "NON", 100));

        let table = netter.table();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].broker, "DNB");
        assert_eq!(table[0].net, 100);
        assert!(table[0].positive);
        assert_eq!(table[0].bought_trades, 1);
        assert_eq!(table[0].sold_trades, 0);
        assert_eq!(table[1].broker, "NON");
        assert_eq!(table[1].net, -100);
        assert!(!table[1].positive);
    }

    #[test]
    fn test_sorted_descending_and_zero_sum() {
        let mut netter = BrokerNetter::new();
        netter.add_trades(&[
            make_trade("A", "B", 50),
            make_trade("C", "A", 20),
            make_trade("B", "D", 70),
            make_trade("D", "C", 10),
            make_trade("A", "D", 5),
        ]);

        let table = netter.table();
        assert!(table.windows(2).all(|w| w[0].net >= w[1].net));
        assert_eq!(table.iter().map(|s| s.net).sum::<i64>(), 0);
        for (i, stat) in table.iter().enumerate() {
            assert_eq!(stat.rank, i);
        }
    }

    #[test]
    fn test_ties_keep_broker_order() {
        let mut netter = BrokerNetter::new();
        // Z and M both net +10, K and B both net -10.
        netter.add_trades(&[make_trade("Z", "K", 10), make_trade("M", "B", 10)]);

        let table = netter.table();
        let brokers: Vec<&str> = table.iter().map(|s| s.broker.as_str()).collect();
        assert_eq!(brokers, vec!["M", "Z", "B", "K"]);
    }

    #[test]
    fn test_one_sided_broker_gets_zero() {
        let mut netter = BrokerNetter::new();
        netter.add_trades(&[make_trade("A", "B", 10), make_trade("A", "B", 15)]);

        let table = netter.table();
        let a = table.iter().find(|s| s.broker == "A").unwrap();
        assert_eq!(a.bought_volume, 25);
        assert_eq!(a.bought_trades, 2);
        assert_eq!(a.sold_volume, 0);
        assert_eq!(a.sold_trades, 0);
    }

    #[test]
    fn test_self_trade_nets_zero() {
        // After an alias fix both legs belong to the same broker.
        let mut netter = BrokerNetter::new();
        netter.add_trade(&make_trade("DNB", "DNB", 40));

        let table = netter.table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].bought_volume, 40);
        assert_eq!(table[0].sold_volume, 40);
        assert_eq!(table[0].net, 0);
        assert!(!table[0].positive);
    }

    #[test]
    fn test_blank_brokers_skipped() {
        let mut netter = BrokerNetter::new();
        netter.add_trade(&make_trade("", "NON", 10));

        assert_eq!(netter.broker_count(), 1);
        assert_eq!(netter.table()[0].broker, "NON");

        netter.clear();
        assert!(netter.table().is_empty());
    }
}
