use crate::core::error::FetchError;
use crate::core::nav::{NavFetcher, RawNavRecord};
use crate::providers::util::with_retry;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

/// App client User-Agent the NAV endpoint expects.
const USER_AGENT: &str = "EMProjJijin/6.6.13 (iPhone; iOS 17.4.1; Scale/3.00)";

#[derive(Debug, Deserialize)]
struct VPageDiagramResponse {
    #[serde(default)]
    data: Vec<VPageDiagramRow>,
    #[serde(rename = "totalCount", default)]
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct VPageDiagramRow {
    #[serde(rename = "FSRQ")]
    date: String,
    #[serde(rename = "DWJZ", default)]
    unit_value: String,
    #[serde(rename = "LJJZ", default)]
    cumulative_value: String,
    #[serde(rename = "JZZZL", default)]
    growth_rate: Option<String>,
}

/// Fetches the full NAV history of a fund from the Eastmoney
/// `FundVPageDiagram` endpoint.
pub struct EastmoneyNavProvider {
    base_url: String,
}

impl EastmoneyNavProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl NavFetcher for EastmoneyNavProvider {
    async fn fetch_nav(&self, fund_code: &str) -> Result<Vec<RawNavRecord>, FetchError> {
        let url = format!("{}/mm/newCore/FundVPageDiagram", self.base_url);
        debug!(fund_code, url, "requesting NAV history");

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let response = with_retry(
            || async {
                client
                    .get(&url)
                    .query(&[("FCODE", fund_code), ("RANGE", "ln")])
                    .send()
                    .await
            },
            3,
            500,
        )
        .await
        .with_context(|| format!("NAV request failed for fund: {fund_code}"))?;

        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for fund: {fund_code}"))?;

        let parsed: VPageDiagramResponse = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse NAV response"
                );
                return Err(FetchError::Network(
                    anyhow::Error::from(e).context("Failed to parse NAV response"),
                ));
            }
        };

        if parsed.total_count == 0 || parsed.data.is_empty() {
            warn!(fund_code, "NAV endpoint returned no rows");
            return Ok(Vec::new());
        }

        debug!(
            fund_code,
            rows = parsed.data.len(),
            "fetched NAV history"
        );

        Ok(parsed
            .data
            .into_iter()
            .map(|row| RawNavRecord {
                date: row.date,
                unit_value: row.unit_value,
                cumulative_value: row.cumulative_value,
                growth_rate: row.growth_rate,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(fund_code: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/mm/newCore/FundVPageDiagram"))
            .and(query_param("FCODE", fund_code))
            .and(query_param("RANGE", "ln"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    const MOCK_JSON: &str = r#"{
        "data": [
            {"FSRQ": "2024-01-02", "DWJZ": "1.0215", "LJJZ": "2.1034", "JZZZL": "0.15"},
            {"FSRQ": "2024-01-03", "DWJZ": "", "LJJZ": "2.1034", "JZZZL": null}
        ],
        "errorCode": 0,
        "totalCount": 2,
        "success": true
    }"#;

    #[tokio::test]
    async fn test_fetch_nav_rows() {
        let mock_server = create_mock_server("004898", MOCK_JSON).await;
        let provider = EastmoneyNavProvider::new(&mock_server.uri());

        let records = provider.fetch_nav("004898").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2024-01-02");
        assert_eq!(records[0].unit_value, "1.0215");
        assert_eq!(records[0].cumulative_value, "2.1034");
        assert_eq!(records[0].growth_rate.as_deref(), Some("0.15"));
        // Empty and null upstream fields survive as-is; the repository
        // decides what they mean.
        assert_eq!(records[1].unit_value, "");
        assert_eq!(records[1].growth_rate, None);
    }

    #[tokio::test]
    async fn test_zero_total_count_is_an_empty_series() {
        let mock_server = create_mock_server(
            "999999",
            r#"{"data": [], "errorCode": 0, "totalCount": 0, "success": true}"#,
        )
        .await;
        let provider = EastmoneyNavProvider::new(&mock_server.uri());

        let records = provider.fetch_nav("999999").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_body_is_a_network_error() {
        let mock_server = create_mock_server("004898", "<html>gateway error</html>").await;
        let provider = EastmoneyNavProvider::new(&mock_server.uri());

        let result = provider.fetch_nav("004898").await;
        assert!(result.is_err());
    }
}
