use crate::core::error::FetchError;
use crate::core::nav::{DirectoryEntry, FundDirectory};
use crate::providers::util::with_retry;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

const USER_AGENT: &str = "EMProjJijin/6.6.13 (iPhone; iOS 17.4.1; Scale/3.00)";

#[derive(Debug, Deserialize)]
struct FundListResponse {
    #[serde(default)]
    data: Vec<FundListRow>,
}

#[derive(Debug, Deserialize)]
struct FundListRow {
    #[serde(rename = "FCODE")]
    code: String,
    #[serde(rename = "SHORTNAME", default)]
    name: String,
    #[serde(rename = "FTYPE", default)]
    fund_type: String,
    #[serde(rename = "SGZT", default)]
    subscription_status: String,
    #[serde(rename = "SHZT", default)]
    redemption_status: String,
}

/// Fetches the public fund directory (code, name, type and trading
/// status per fund).
pub struct EastmoneyDirectoryProvider {
    base_url: String,
}

impl EastmoneyDirectoryProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl FundDirectory for EastmoneyDirectoryProvider {
    async fn fetch_directory(&self) -> Result<Vec<DirectoryEntry>, FetchError> {
        let url = format!("{}/mm/FundMNewApi/FundMNFundList", self.base_url);
        debug!(url, "requesting fund directory");

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let response = with_retry(|| async { client.get(&url).send().await }, 3, 500)
            .await
            .context("Fund directory request failed")?;

        let response_text = response
            .text()
            .await
            .context("Failed to get fund directory response text")?;

        let parsed: FundListResponse = match serde_json::from_str(&response_text) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = ?e, "Failed to parse fund directory response");
                return Err(FetchError::Network(
                    anyhow::Error::from(e).context("Failed to parse fund directory response"),
                ));
            }
        };

        debug!(rows = parsed.data.len(), "fetched fund directory");

        Ok(parsed
            .data
            .into_iter()
            .map(|row| DirectoryEntry {
                code: row.code,
                name: row.name,
                fund_type: row.fund_type,
                subscription_status: row.subscription_status,
                redemption_status: row.redemption_status,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "data": [
            {"FCODE": "004898", "SHORTNAME": "华夏成长", "FTYPE": "混合型", "SGZT": "开放申购", "SHZT": "开放赎回"},
            {"FCODE": "000198", "SHORTNAME": "天弘余额宝", "FTYPE": "货币型", "SGZT": "开放申购", "SHZT": "开放赎回"}
        ],
        "errorCode": 0,
        "totalCount": 2,
        "success": true
    }"#;

    #[tokio::test]
    async fn test_fetch_directory() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mm/FundMNewApi/FundMNFundList"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .mount(&mock_server)
            .await;

        let provider = EastmoneyDirectoryProvider::new(&mock_server.uri());
        let entries = provider.fetch_directory().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "004898");
        assert_eq!(entries[0].name, "华夏成长");
        assert_eq!(entries[0].fund_type, "混合型");
        assert_eq!(entries[1].fund_type, "货币型");
        assert_eq!(entries[1].subscription_status, "开放申购");
    }
}
