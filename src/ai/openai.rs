//! OpenAI-backed implementation of the three generation capabilities.
//! One client, Chat Completions with JSON-mode responses parsed into typed
//! outputs. Requires `OPENAI_API_KEY`.

use crate::ai::{IntroGenerator, Ranker, Summarizer, SummaryOutput};
use crate::email::{EmailIntro, RankedArticle};
use crate::model::ContentKind;
use crate::profile::UserProfile;
use crate::rank::{RankCandidate, RankedEntry};
use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SUMMARY_PROMPT: &str = "You are an Expert AI news analyst specializing in summarizing technical content.\n\
\n\
Your role is to:\n\
- Analyze technical articles, research papers, and video transcripts\n\
- Create compelling, concise digests for AI professionals\n\
\n\
Guidelines:\n\
- Title: 5-10 words, compelling and specific\n\
- Summary: 2-3 sentences capturing the essence\n\
- Focus on actionable insights and practical implications\n\
- Avoid marketing hype, fluff, and unnecessary jargon\n\
- Highlight novel contributions or breakthroughs\n\
- Include practical takeaways when relevant\n\
\n\
Respond with a JSON object: {\"title\": string, \"summary\": string}.";

const CURATOR_PROMPT: &str = "You are an Expert AI news curator specializing in personalized content ranking.\n\
\n\
Your task is to analyze and rank digests based on a user's profile and interests.\n\
\n\
Scoring Criteria:\n\
1. Relevance: How well does the content align with the user's interests?\n\
2. Technical Depth: Does it provide substantive technical insights?\n\
3. Novelty: Is it cutting-edge or introducing new concepts?\n\
4. Alignment: How well does it match the user's preferences (practical, research-focused, etc.)?\n\
5. Actionability: Can the reader apply the insights practically?\n\
\n\
Scoring Guidelines:\n\
- 9.0-10.0 (Highly Relevant): Perfect match for user profile, high technical depth, novel breakthrough\n\
- 7.0-8.9 (Very Relevant): Strong alignment, good technical content, actionable insights\n\
- 5.0-6.9 (Moderately Relevant): Some alignment, decent technical content, limited actionability\n\
- 3.0-4.9 (Weakly Relevant): Limited alignment, basic content, minimal actionability\n\
- 1.0-2.9 (Not Relevant): Poor alignment, low technical value, not actionable\n\
\n\
Provide clear reasoning for each score.\n\
\n\
Respond with a JSON object: {\"articles\": [{\"digest_id\": string, \"relevance_score\": number, \"rank\": integer, \"reasoning\": string}]},\n\
sorted by relevance score from highest to lowest.";

const INTRO_PROMPT: &str = "You are an expert email writer specializing in crafting personalized daily AI news digests.\n\
\n\
Your role is to write a warm, professional introduction for daily AI news digests tailored to the user.\n\
\n\
Requirements:\n\
- Greet the user by their first name\n\
- Include today's date\n\
- Preview the top articles and what makes them interesting\n\
- Maintain a tone that is professional yet approachable\n\
- Keep the introduction concise (3-4 sentences)\n\
- Show enthusiasm for the curated content\n\
\n\
Respond with a JSON object: {\"greeting\": string, \"introduction\": string}.";

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// `model_override`: pass Some("gpt-4.1") to override the default.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-digest/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key,
            model: model_override.unwrap_or(DEFAULT_MODEL).to_string(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY missing")?;
        let model = std::env::var("OPENAI_MODEL").ok();
        Self::new(api_key, model.as_deref())
    }

    async fn chat_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<T> {
        if self.api_key.is_empty() {
            bail!("openai api key is empty");
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            response_format: serde_json::Value,
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

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            response_format: serde_json::json!({ "type": "json_object" }),
        };

        let resp = self
            .http
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("openai returned {status}: {body}");
        }

        let body: Resp = resp.json().await.context("reading openai response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| anyhow!("openai response had no choices"))?;

        serde_json::from_str(content)
            .with_context(|| format!("parsing openai json content: {content}"))
    }
}

#[async_trait::async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(
        &self,
        title: &str,
        body: &str,
        kind: ContentKind,
    ) -> Result<SummaryOutput> {
        let user = format!("Create a digest for this {kind}: \n Title: {title} \n Content: {body}");
        self.chat_json(SUMMARY_PROMPT, &user, 0.7).await
    }
}

#[async_trait::async_trait]
impl Ranker for OpenAiClient {
    async fn rank(
        &self,
        profile: &UserProfile,
        candidates: &[RankCandidate],
    ) -> Result<Vec<RankedEntry>> {
        #[derive(Deserialize)]
        struct WireRanked {
            digest_id: String,
            relevance_score: f32,
            rank: u32,
            reasoning: Option<String>,
        }
        #[derive(Deserialize)]
        struct WireList {
            articles: Vec<WireRanked>,
        }

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let system = format!("{CURATOR_PROMPT}\n\n{}", profile.prompt_context());
        let listing = candidates
            .iter()
            .map(|c| {
                format!(
                    "ID: {}\nTitle: {}\nSummary: {}\nType: {}",
                    c.id, c.title, c.summary, c.kind
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Please rank the following digests based on the user profile and criteria provided:\n\n{listing}"
        );

        let wire: WireList = self.chat_json(&system, &user, 0.3).await?;
        Ok(wire
            .articles
            .into_iter()
            .map(|w| RankedEntry {
                digest_id: w.digest_id,
                score: w.relevance_score,
                rank: w.rank,
                reasoning: w.reasoning.unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl IntroGenerator for OpenAiClient {
    async fn generate_intro(
        &self,
        profile: &UserProfile,
        top_articles: &[RankedArticle],
    ) -> Result<EmailIntro> {
        #[derive(Deserialize)]
        struct WireIntro {
            greeting: String,
            introduction: String,
        }

        let today = chrono::Utc::now().format("%B %-d, %Y");
        let listing = top_articles
            .iter()
            .map(|a| format!("- {} (Score: {:.1}/10)", a.title, a.score))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Generate a warm introduction for a daily AI news digest for {}.\n\n\
             Today's date: {today}\n\
             Top articles to be featured:\n{listing}\n\n\
             Create a greeting and brief introduction that makes them excited to read the digest.",
            profile.name
        );

        let wire: WireIntro = self.chat_json(INTRO_PROMPT, &user, 0.7).await?;

        // Keep the greeting on-format even when the model drifts.
        let expected = format!("Hey {}", profile.name);
        let greeting = if wire.greeting.starts_with(&expected) {
            wire.greeting
        } else {
            format!("{expected}!")
        };

        Ok(EmailIntro {
            greeting,
            body: wire.introduction,
        })
    }
}
