use std::collections::HashSet;

use crate::config::ClassifierConfig;
use crate::models::{BusinessLine, PoolRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    TokenizedEquity,
    GoldKeyword,
    BothStable,
    AnyMajor,
    Fallback,
}

/// Evaluation order. The first matching rule decides the business line.
const RULES: [(Rule, BusinessLine); 5] = [
    (Rule::TokenizedEquity, BusinessLine::TokenizedEquity),
    (Rule::GoldKeyword, BusinessLine::GoldRwa),
    (Rule::BothStable, BusinessLine::Stablecoin),
    (Rule::AnyMajor, BusinessLine::Major),
    (Rule::Fallback, BusinessLine::Other),
];

/// Assigns each pool to exactly one business line.
#[derive(Clone)]
pub struct PoolClassifier {
    equity_category: i64,
    equity_suffix: char,
    equity_min_len: usize,
    gold_keywords: Vec<String>,
    stables: HashSet<String>,
    majors: HashSet<String>,
}

impl PoolClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            equity_category: config.tokenized_equity_category,
            equity_suffix: config.tokenized_equity_suffix,
            equity_min_len: config.tokenized_equity_min_len,
            gold_keywords: config.gold_keywords.clone(),
            stables: config.stable_symbols.iter().cloned().collect(),
            majors: config.major_symbols.iter().cloned().collect(),
        }
    }

    /// Tokenized-equity ticker such as `TSLAx`: designated suffix, minimum
    /// length, and a prefix with at least one upper-case letter and no lower-case letter.
    fn is_equity_ticker(&self, symbol: &str) -> bool {
        if symbol.chars().count() < self.equity_min_len {
            return false;
        }
        let Some(prefix) = symbol.strip_suffix(self.equity_suffix) else {
            return false;
        };
        prefix.chars().any(char::is_uppercase) && !prefix.chars().any(char::is_lowercase)
    }

    fn matches(&self, rule: Rule, category: i64, base: &str, quote: &str) -> bool {
        match rule {
            Rule::TokenizedEquity => {
                category == self.equity_category
                    || self.is_equity_ticker(base)
                    || self.is_equity_ticker(quote)
            }
            Rule::GoldKeyword => self.gold_keywords.iter()
                .any(|kw| base.contains(kw.as_str()) || quote.contains(kw.as_str())),
            Rule::BothStable => self.stables.contains(base) && self.stables.contains(quote),
            Rule::AnyMajor => self.majors.contains(base) || self.majors.contains(quote),
            Rule::Fallback => true,
        }
    }

    pub fn classify(&self, category: i64, base: &str, quote: &str) -> BusinessLine {
        RULES.iter()
            .find(|(rule, _)| self.matches(*rule, category, base, quote))
            .map(|(_, line)| *line)
            .unwrap_or(BusinessLine::Other)
    }

    pub fn classify_record(&self, record: &PoolRecord) -> BusinessLine {
        self.classify(record.category, &record.base_symbol, &record.quote_symbol)
    }

    /// Tag every record in place.
    pub fn classify_all(&self, records: &mut [PoolRecord]) {
        for record in records.iter_mut() {
            record.business_line = self.classify_record(record);
            tracing::trace!("    {} ({}) -> {}", record.name, record.address, record.business_line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PoolClassifier {
        PoolClassifier::new(&ClassifierConfig::default())
    }

    #[test]
    fn reserved_category_is_tokenized_equity() {
        assert_eq!(classifier().classify(32, "FOO", "BAR"), BusinessLine::TokenizedEquity);
    }

    #[test]
    fn equity_ticker_pattern() {
        let c = classifier();
        assert_eq!(c.classify(0, "TSLAx", "USDC"), BusinessLine::TokenizedEquity);
        assert_eq!(c.classify(0, "USDC", "NVDAx"), BusinessLine::TokenizedEquity);
        assert_eq!(c.classify(0, "SPY500x", "SOL"), BusinessLine::TokenizedEquity);
        // too short, lower-case prefix, digits only, wrong suffix
        assert_eq!(c.classify(0, "Ax", "BONK"), BusinessLine::Other);
        assert_eq!(c.classify(0, "Tslax", "BONK"), BusinessLine::Other);
        assert_eq!(c.classify(0, "500x", "BONK"), BusinessLine::Other);
        assert_eq!(c.classify(0, "TSLAX", "BONK"), BusinessLine::Other);
        // letters without case never make a ticker
        assert_eq!(c.classify(0, "中文x", "BONK"), BusinessLine::Other);
        assert_eq!(c.classify(0, "X中x", "BONK"), BusinessLine::TokenizedEquity);
    }

    #[test]
    fn gold_keyword_is_case_sensitive_substring() {
        let c = classifier();
        assert_eq!(c.classify(0, "XAUt0", "USDT"), BusinessLine::GoldRwa);
        assert_eq!(c.classify(0, "XAUT", "USDT"), BusinessLine::Other);
    }

    #[test]
    fn stable_pair_requires_both_sides() {
        let c = classifier();
        assert_eq!(c.classify(0, "USDC", "USDT"), BusinessLine::Stablecoin);
        assert_eq!(c.classify(0, "USDC", "BONK"), BusinessLine::Other);
    }

    #[test]
    fn major_on_either_side() {
        let c = classifier();
        assert_eq!(c.classify(0, "SOL", "USDC"), BusinessLine::Major);
        assert_eq!(c.classify(0, "JUP", "Wrapped SOL"), BusinessLine::Major);
        assert_eq!(c.classify(0, "JUP", "BONK"), BusinessLine::Other);
    }

    #[test]
    fn priority_order_decides_overlaps() {
        let c = classifier();
        // equity beats gold, stable and major
        assert_eq!(c.classify(32, "XAUt", "SOL"), BusinessLine::TokenizedEquity);
        assert_eq!(c.classify(0, "TSLAx", "SOL"), BusinessLine::TokenizedEquity);
        // gold beats major
        assert_eq!(c.classify(0, "XAUt", "SOL"), BusinessLine::GoldRwa);
        // stable beats major when a stablecoin is also configured as major
        let config = ClassifierConfig {
            major_symbols: vec!["USDC".into()],
            ..Default::default()
        };
        assert_eq!(PoolClassifier::new(&config).classify(0, "USDC", "USDT"), BusinessLine::Stablecoin);
    }

    #[test]
    fn every_input_gets_exactly_one_line() {
        let c = classifier();
        let symbols = ["", "SOL", "USDC", "USDT", "XAUt", "TSLAx", "bonk", "Wrapped Ether", "AAPLx", "x"];
        for cat in [0, 1, 32, -1] {
            for base in symbols {
                for quote in symbols {
                    let line = c.classify(cat, base, quote);
                    assert!(BusinessLine::ALL.contains(&line));
                    assert_eq!(line, c.classify(cat, base, quote));
                }
            }
        }
    }

    #[test]
    fn classify_all_tags_records() {
        let mut records = vec![
            PoolRecord { base_symbol: "SOL".into(), quote_symbol: "USDC".into(), ..Default::default() },
            PoolRecord { category: 32, ..Default::default() },
        ];
        classifier().classify_all(&mut records);
        assert_eq!(records[0].business_line, BusinessLine::Major);
        assert_eq!(records[1].business_line, BusinessLine::TokenizedEquity);
    }
}
