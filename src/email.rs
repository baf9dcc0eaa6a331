//! Email digest assembly: payload types, the deterministic intro fallback,
//! and the two renderings (markdown and styled HTML) of the same payload.

use crate::model::ContentKind;
use crate::profile::UserProfile;
use chrono::{DateTime, Utc};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};

/// Greeting + introduction paragraph at the top of the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailIntro {
    pub greeting: String,
    pub body: String,
}

/// A ranked entry joined back onto its digest fields.
#[derive(Debug, Clone, Serialize)]
pub struct RankedArticle {
    pub digest_id: String,
    pub rank: u32,
    pub score: f32,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub kind: ContentKind,
    pub reasoning: Option<String>,
}

/// The complete digest email, bounded to the top N ranked articles.
#[derive(Debug, Clone, Serialize)]
pub struct EmailDigestPayload {
    pub intro: EmailIntro,
    pub articles: Vec<RankedArticle>,
    pub total_ranked: usize,
    pub shown: usize,
}

impl EmailDigestPayload {
    pub fn new(intro: EmailIntro, articles: Vec<RankedArticle>, total_ranked: usize) -> Self {
        let shown = articles.len();
        Self {
            intro,
            articles,
            total_ranked,
            shown,
        }
    }

    /// Plain/markdown rendering.
    pub fn to_markdown(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push(self.intro.greeting.clone());
        lines.push(String::new());
        lines.push(self.intro.body.clone());
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());

        for article in &self.articles {
            lines.push(format!("## {}. {}", article.rank, article.title));
            lines.push(format!(
                "**Score:** {:.1}/10 | **Type:** {}",
                article.score, article.kind
            ));
            lines.push(String::new());
            lines.push(article.summary.clone());
            lines.push(String::new());
            lines.push(format!("[Read more →]({})", article.url));
            if let Some(reasoning) = &article.reasoning {
                lines.push(String::new());
                lines.push(format!("*Why curated: {reasoning}*"));
            }
            lines.push(String::new());
            lines.push("---".to_string());
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Styled HTML rendering of the same payload.
    pub fn to_html(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        parts.push(format!("<h1>{}</h1>", encode_text(&self.intro.greeting)));
        parts.push(format!("<p>{}</p>", encode_text(&self.intro.body)));
        parts.push("<hr>".to_string());

        for article in &self.articles {
            parts.push(format!(
                "<h3>#{}. {}</h3>",
                article.rank,
                encode_text(&article.title)
            ));
            parts.push(format!(
                "<p><strong>Score:</strong> {:.1}/10 | <strong>Type:</strong> {}</p>",
                article.score,
                encode_text(article.kind.as_str())
            ));
            parts.push(format!("<p>{}</p>", encode_text(&article.summary)));
            parts.push(format!(
                "<p><a href=\"{}\">Read more →</a></p>",
                encode_text(&article.url)
            ));
            if let Some(reasoning) = &article.reasoning {
                parts.push(format!(
                    "<p><em>Why curated: {}</em></p>",
                    encode_text(reasoning)
                ));
            }
            parts.push("<hr>".to_string());
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            line-height: 1.6;
            color: #333;
        }}
        a {{
            color: #0066cc;
            text-decoration: none;
        }}
        a:hover {{
            text-decoration: underline;
        }}
        h1 {{
            color: #0066cc;
            margin-bottom: 10px;
        }}
        h3 {{
            color: #222;
            margin-top: 20px;
        }}
        hr {{
            border: none;
            border-top: 2px solid #ddd;
            margin: 30px 0;
        }}
        strong {{
            color: #222;
        }}
    </style>
</head>
<body>
    {}
</body>
</html>"#,
            parts.join("\n    ")
        )
    }
}

/// Deterministic intro used when the generation capability fails.
pub fn fallback_intro(profile: &UserProfile) -> EmailIntro {
    EmailIntro {
        greeting: format!("Hey {}!", profile.name),
        body: "Here's your personalized AI news digest for today.".to_string(),
    }
}

/// Subject line for a digest sent on the given date.
pub fn subject_for(date: DateTime<Utc>) -> String {
    format!("Daily AI News Digest - {}", date.format("%B %-d, %Y"))
}
