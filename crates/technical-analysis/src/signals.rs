use analysis_core::{AnalysisError, PriceSeries, Signal, TechnicalSignal};

use crate::indicators::{rsi, sma};

pub const RSI_PERIOD: usize = 14;
pub const FAST_SMA_PERIOD: usize = 50;
pub const SLOW_SMA_PERIOD: usize = 200;
pub const VOLUME_WINDOW: usize = 20;

/// RSI bands for the trend rules
#[derive(Debug, Clone)]
pub struct SignalThresholds {
    /// Inclusive RSI band for BUY
    pub buy_rsi_min: f64,
    pub buy_rsi_max: f64,
    /// RSI strictly above this is SELL regardless of trend
    pub sell_rsi_above: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            buy_rsi_min: 55.0,
            buy_rsi_max: 70.0,
            sell_rsi_above: 75.0,
        }
    }
}

/// Classifies the latest session of a price series as BUY/SELL/HOLD.
pub struct TechnicalSignalEngine {
    thresholds: SignalThresholds,
}

impl Default for TechnicalSignalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TechnicalSignalEngine {
    pub fn new() -> Self {
        Self {
            thresholds: SignalThresholds::default(),
        }
    }

    pub fn with_thresholds(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// BUY: close > sma50 > sma200 with RSI inside the buy band.
    /// SELL: RSI above the sell level, or close below sma50.
    pub fn classify(&self, close: f64, sma50: f64, sma200: f64, rsi: f64) -> Signal {
        let t = &self.thresholds;
        if close > sma50 && sma50 > sma200 && rsi >= t.buy_rsi_min && rsi <= t.buy_rsi_max {
            Signal::Buy
        } else if rsi > t.sell_rsi_above || close < sma50 {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    /// Evaluate the most recent observation of `series`.
    ///
    /// `tech_score` is only produced for SELL rows: RSI plus the ratio of the
    /// latest volume to its 20-session average. BUY and HOLD carry no score.
    pub fn evaluate(&self, series: &PriceSeries) -> Result<TechnicalSignal, AnalysisError> {
        if series.len() < SLOW_SMA_PERIOD {
            return Err(AnalysisError::InsufficientHistory {
                symbol: series.symbol.clone(),
                needed: SLOW_SMA_PERIOD,
                got: series.len(),
            });
        }

        let closes = series.closes();
        let volumes = series.volumes();
        if closes.iter().chain(volumes.iter()).any(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidData(format!(
                "{}: non-finite close or volume in history",
                series.symbol
            )));
        }

        let missing = |what: &str| {
            AnalysisError::CalculationError(format!("{}: no {} value", series.symbol, what))
        };
        let price = *closes.last().ok_or_else(|| missing("close"))?;
        let rsi_now = *rsi(&closes, RSI_PERIOD).last().ok_or_else(|| missing("RSI"))?;
        let sma50 = *sma(&closes, FAST_SMA_PERIOD).last().ok_or_else(|| missing("SMA50"))?;
        let sma200 = *sma(&closes, SLOW_SMA_PERIOD).last().ok_or_else(|| missing("SMA200"))?;

        let signal = self.classify(price, sma50, sma200, rsi_now);

        let tech_score = match signal {
            Signal::Sell => {
                let avg_volume = *sma(&volumes, VOLUME_WINDOW)
                    .last()
                    .ok_or_else(|| missing("average volume"))?;
                let volume = *volumes.last().ok_or_else(|| missing("volume"))?;
                if avg_volume <= 0.0 {
                    return Err(AnalysisError::CalculationError(format!(
                        "{}: zero average volume",
                        series.symbol
                    )));
                }
                Some(rsi_now + volume / avg_volume)
            }
            Signal::Buy | Signal::Hold => None,
        };

        Ok(TechnicalSignal {
            symbol: series.symbol.clone(),
            price,
            rsi: rsi_now,
            sma50,
            sma200,
            tech_score,
            signal,
        })
    }
}
