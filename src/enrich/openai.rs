//! OpenAI-backed enrichment gateway (Chat Completions API).
//!
//! The model is asked for a strict JSON object keyed by listing id, so results
//! correlate by id and nothing is ever regex-scraped back out of rendered
//! prose. Requires `OPENAI_API_KEY`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{EnrichmentGateway, EnrichmentOutcome};
use crate::listing::{parse_price_eur, Listing};

const SYSTEM_PROMPT: &str = "You are a mobility profitability analyst for car renting plus \
peer-to-peer subletting in Madrid. For every listing you receive, estimate the monthly net \
profit (rental income minus the renting fee and a 20% platform commission, assuming 12-15 \
occupied days per month) and a 0-100 profitability score. Respond with ONLY a JSON object \
mapping each listing id to an object with numeric fields \"score\" and \"net_profit_eur\", \
plus optional string fields \"segment\" and \"rationale\" (one sentence). No other text.";

pub struct OpenAiGateway {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGateway {
    /// `model_override`: pass Some("gpt-4o") to override; defaults to the
    /// `OPENAI_MODEL` env var, then gpt-4o-mini.
    pub fn new(model_override: Option<&str>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("renting-radar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building reqwest client")?;
        let model = match model_override {
            Some(m) => m.to_string(),
            None => std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

/// What the gateway actually needs per listing: the id plus descriptive text.
#[derive(Serialize)]
struct ListingPayload<'a> {
    id: &'a str,
    model: &'a str,
    price: &'a str,
    monthly_price_eur: Option<f64>,
    contract: &'a str,
    usage: &'a str,
    details: &'a BTreeMap<String, serde_json::Value>,
}

#[async_trait::async_trait]
impl EnrichmentGateway for OpenAiGateway {
    async fn enrich(&self, batch: &[Listing]) -> Result<HashMap<String, EnrichmentOutcome>> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: ResponseFormat<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let payload: Vec<ListingPayload<'_>> = batch
            .iter()
            .map(|l| ListingPayload {
                id: &l.id,
                model: &l.fingerprint.model,
                price: &l.fingerprint.price,
                monthly_price_eur: parse_price_eur(&l.fingerprint.price),
                contract: &l.fingerprint.contract,
                usage: &l.fingerprint.usage,
                details: &l.details,
            })
            .collect();
        let user_content =
            serde_json::to_string_pretty(&payload).context("serializing listing batch")?;

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user_content,
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("calling chat completions")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("chat completions returned {status}");
        }
        let body: Resp = resp.json().await.context("decoding chat completions body")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");

        parse_outcomes(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Decode the model output into per-id outcomes. Entries that are not objects
/// are local failures, never batch failures.
fn parse_outcomes(content: &str) -> Result<HashMap<String, EnrichmentOutcome>> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).context("gateway did not return valid JSON")?;
    let map = match value {
        serde_json::Value::Object(map) => map,
        other => bail!("gateway returned non-object JSON: {other}"),
    };

    let mut out = HashMap::new();
    for (id, entry) in map {
        match entry {
            serde_json::Value::Object(fields) => {
                out.insert(
                    id,
                    EnrichmentOutcome::Enriched(fields.into_iter().collect()),
                );
            }
            other => {
                out.insert(
                    id,
                    EnrichmentOutcome::Failed(format!("malformed entry: {other}")),
                );
            }
        }
    }
    Ok(out)
}
