//! Fundamental screening rules applied to fetched company data.

use serde::{Deserialize, Serialize};

pub const OFFICIAL_WALLSTREET_SECTORS: [&str; 11] = [
    "Communication Services",
    "Consumer Discretionary",
    "Consumer Staples",
    "Energy",
    "Financials",
    "Health Care",
    "Industrials",
    "Information Technology",
    "Materials",
    "Real Estate",
    "Utilities",
];

pub const MIN_VOLUME: u64 = 250_000;
pub const MIN_RETURN_ON_EQUITY: f64 = 10.0;
pub const MAX_DEBT_TO_EQUITY: f64 = 2.0;
pub const MAX_PRICE_TO_EARNINGS: f64 = 20.0;

/// One fundamental check. All bounds are strict.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FundamentalCheck {
    /// Shares traded; weeds out illiquid stocks.
    Volume,
    /// Profitability in percent.
    ReturnOnEquity,
    DebtToEquity,
    PriceToEarnings,
}

impl FundamentalCheck {
    pub const ALL: [FundamentalCheck; 4] = [
        FundamentalCheck::Volume,
        FundamentalCheck::ReturnOnEquity,
        FundamentalCheck::DebtToEquity,
        FundamentalCheck::PriceToEarnings,
    ];

    pub fn passes(self, value: f64) -> bool {
        match self {
            FundamentalCheck::Volume => value > MIN_VOLUME as f64,
            FundamentalCheck::ReturnOnEquity => value > MIN_RETURN_ON_EQUITY,
            FundamentalCheck::DebtToEquity => value < MAX_DEBT_TO_EQUITY,
            FundamentalCheck::PriceToEarnings => value < MAX_PRICE_TO_EARNINGS,
        }
    }
}

pub fn is_official_sector(sector: &str) -> bool {
    OFFICIAL_WALLSTREET_SECTORS.contains(&sector)
}
