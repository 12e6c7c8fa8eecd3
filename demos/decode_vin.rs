use fetch_retry::{RequestOptions, RetryConfig, RetryingFetcher};
use serde_json::Value as JsonValue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let vin = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "1N4BL4BVXPN411697".to_owned());
    let url = format!("https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVin/{vin}?format=json");

    let fetcher = RetryingFetcher::new()
        .with_config(RetryConfig::from_env()?)
        .retry_on_server_errors(true);

    let response = fetcher
        .fetch(
            &url,
            RequestOptions::get().header("User-Agent", "CarDetective/1.0"),
        )
        .await?
        .error_for_status()?;

    let data: JsonValue = response.json().await?;
    let results = data["Results"].as_array().cloned().unwrap_or_default();
    for variable in ["Make", "Model", "Model Year", "Trim", "Body Class"] {
        let value = results
            .iter()
            .find(|item| item["Variable"] == variable)
            .and_then(|item| item["Value"].as_str())
            .unwrap_or("-");
        println!("{variable:>12}: {value}");
    }

    Ok(())
}
