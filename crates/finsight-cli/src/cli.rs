use analysis_core::Interval;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "finsight")]
#[command(about = "Heuristic equity and crypto analysis reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full equity report: valuation, growth, quality, risk, sentiment and technicals
    Analyze {
        symbol: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Technical and price-risk report for a crypto pair such as BTCUSDT
    Crypto {
        pair: String,
        #[arg(long, default_value = "daily", value_parser = parse_interval)]
        interval: Interval,
        #[arg(long)]
        json: bool,
    },
    /// Technical section only
    Technicals {
        symbol: String,
        #[arg(long, default_value = "daily", value_parser = parse_interval)]
        interval: Interval,
    },
    /// Analyze and rank several equities
    Watchlist {
        #[arg(required = true)]
        symbols: Vec<String>,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Current Treasury yield curve
    Yields,
}

fn parse_interval(raw: &str) -> Result<Interval, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_with_json_flag() {
        let cli = Cli::try_parse_from(["finsight", "analyze", "AAPL", "--json"]).unwrap();
        match cli.command {
            Command::Analyze { symbol, json } => {
                assert_eq!(symbol, "AAPL");
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn crypto_interval_defaults_to_daily() {
        let cli = Cli::try_parse_from(["finsight", "crypto", "BTCUSDT"]).unwrap();
        match cli.command {
            Command::Crypto { pair, interval, json } => {
                assert_eq!(pair, "BTCUSDT");
                assert_eq!(interval, Interval::Daily);
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["finsight", "technicals", "MSFT", "--interval", "hourly"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Technicals { interval: Interval::Hourly, .. }
        ));
    }

    #[test]
    fn rejects_unknown_interval() {
        assert!(Cli::try_parse_from(["finsight", "crypto", "ETHUSDT", "--interval", "monthly"]).is_err());
    }

    #[test]
    fn watchlist_needs_symbols() {
        assert!(Cli::try_parse_from(["finsight", "watchlist"]).is_err());

        let cli = Cli::try_parse_from(["finsight", "watchlist", "KO", "PEP", "--concurrency", "2"]).unwrap();
        match cli.command {
            Command::Watchlist { symbols, concurrency } => {
                assert_eq!(symbols, vec!["KO", "PEP"]);
                assert_eq!(concurrency, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
