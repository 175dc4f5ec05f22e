use crate::config::Settings;

/// NSE large-caps tracked by default. Overridable per deployment via the
/// NSE_SYMBOLS env var; the scanner itself always receives the list as an
/// explicit argument.
const DEFAULT_NSE_SYMBOLS: &[&str] = &[
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK",
    "HINDUNILVR", "SBIN", "BHARTIARTL", "KOTAKBANK", "BAJFINANCE",
    "ITC", "LT", "AXISBANK", "ASIANPAINT", "MARUTI",
    "HCLTECH", "SUNPHARMA", "TITAN", "WIPRO", "ULTRACEMCO",
    "NTPC", "POWERGRID", "NESTLEIND", "TECHM", "TATAMOTORS",
    "ONGC", "COALINDIA", "JSWSTEEL", "ADANIENT", "ADANIPORTS",
    "TATASTEEL", "GRASIM", "BAJAJFINSV", "DIVISLAB", "BPCL",
    "DRREDDY", "CIPLA", "BRITANNIA", "EICHERMOT", "APOLLOHOSP",
    "HEROMOTOCO", "HINDALCO", "INDUSINDBK", "UPL", "SBILIFE",
    "BAJAJ-AUTO", "TATACONSUM", "M&M", "HDFC", "VEDL",
];

pub fn default_nse_universe() -> Vec<String> {
    DEFAULT_NSE_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

/// Parse a comma-separated symbol list: trimmed, uppercased, empties dropped,
/// first occurrence wins on duplicates.
pub fn parse_symbol_list(input: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in input.split(',') {
        let symbol = part.trim().to_ascii_uppercase();
        if symbol.is_empty() || out.contains(&symbol) {
            continue;
        }
        out.push(symbol);
    }
    out
}

/// The symbol universe for this deployment: the NSE_SYMBOLS override when it
/// yields at least one symbol, the default list otherwise.
pub fn tracked_symbols(settings: &Settings) -> Vec<String> {
    match settings.tracked_symbols.as_deref() {
        Some(raw) => {
            let parsed = parse_symbol_list(raw);
            if parsed.is_empty() {
                tracing::warn!("NSE_SYMBOLS set but empty; using default universe");
                default_nse_universe()
            } else {
                parsed
            }
        }
        None => default_nse_universe(),
    }
}
