use analysis_core::{AnalysisError, Interval};
use market_data_client::YahooClient;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (YahooClient, MockServer) {
    let server = MockServer::start().await;
    let client = YahooClient::new(server.uri(), server.uri(), 600);
    (client, server)
}

#[tokio::test]
async fn quote_comes_from_chart_meta() {
    let (client, server) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("range", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "meta": {
                        "symbol": "AAPL",
                        "currency": "USD",
                        "exchangeName": "NMS",
                        "regularMarketPrice": 110.0,
                        "chartPreviousClose": 100.0,
                        "regularMarketTime": 1714680000
                    },
                    "timestamp": [1714680000],
                    "indicators": { "quote": [{ "open": [100.0], "high": [111.0], "low": [99.0], "close": [110.0], "volume": [1000] }] }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let quote = client.get_quote("AAPL").await.unwrap();
    assert_eq!(quote.price, 110.0);
    assert_eq!(quote.exchange.as_deref(), Some("NMS"));
    assert_eq!(quote.change, Some(10.0));
    assert!((quote.change_percent.unwrap() - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn candles_skip_null_rows() {
    let (client, server) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/MSFT"))
        .and(query_param("interval", "1d"))
        .and(query_param("range", "1y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "MSFT", "regularMarketPrice": 12.0 },
                    "timestamp": [1714521600, 1714608000, 1714694400],
                    "indicators": { "quote": [{
                        "open":   [10.0, null, 11.0],
                        "high":   [10.5, null, 12.5],
                        "low":    [9.5,  null, 10.5],
                        "close":  [10.2, null, 12.0],
                        "volume": [500,  null, null]
                    }] }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let candles = client.get_candles("MSFT", Interval::Daily, "1y").await.unwrap();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].close, 10.2);
    assert_eq!(candles[1].close, 12.0);
    assert_eq!(candles[1].volume, 0.0);
    assert_eq!(candles[1].timestamp.timestamp(), 1714694400);
}

#[tokio::test]
async fn fundamentals_merge_summary_modules() {
    let (client, server) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/KO"))
        .and(query_param("modules", "financialData,defaultKeyStatistics,summaryDetail,price"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "price": { "longName": "The Coca-Cola Company", "currency": "USD" },
                    "summaryDetail": {
                        "trailingPE": { "raw": 24.5, "fmt": "24.50" },
                        "marketCap": { "raw": 260000000000i64, "fmt": "260B" }
                    },
                    "defaultKeyStatistics": {
                        "sharesOutstanding": { "raw": 4300000000i64, "fmt": "4.3B" },
                        "bookValue": { "raw": 6.1, "fmt": "6.10" }
                    },
                    "financialData": {
                        "currentPrice": { "raw": 60.5, "fmt": "60.50" },
                        "grossMargins": { "raw": 0.6, "fmt": "60%" },
                        "debtToEquity": { "raw": 160.0, "fmt": "160" },
                        "recommendationKey": "buy"
                    }
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let f = client.get_fundamentals("KO").await.unwrap();
    assert_eq!(f.symbol, "KO");
    assert_eq!(f.long_name.as_deref(), Some("The Coca-Cola Company"));
    assert_eq!(f.trailing_pe, Some(24.5));
    assert_eq!(f.current_price, Some(60.5));
    assert_eq!(f.gross_margins, Some(0.6));
    assert_eq!(f.debt_to_equity_ratio(), Some(1.6));
    assert_eq!(f.market_cap, Some(260_000_000_000.0));
}

#[tokio::test]
async fn provider_error_is_reported() {
    let (client, server) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "quoteSummary": { "result": null, "error": { "code": "Not Found", "description": "Quote not found for ticker symbol: NOPE" } }
        })))
        .mount(&server)
        .await;

    match client.get_fundamentals("NOPE").await {
        Err(AnalysisError::ApiError(msg)) => assert!(msg.starts_with("HTTP 404")),
        other => panic!("expected ApiError, got {:?}", other),
    }
}
