//! Delivery stage behavior: empty-window short-circuit, top-N bounding,
//! intro fallback, and fail-closed ranking.

use ai_news_digest::ai::{IntroGenerator, Ranker};
use ai_news_digest::email::{EmailIntro, RankedArticle};
use ai_news_digest::model::ContentKind;
use ai_news_digest::notify::Notifier;
use ai_news_digest::pipeline::deliver::run_delivery;
use ai_news_digest::profile::UserProfile;
use ai_news_digest::rank::{RankCandidate, RankedEntry};
use ai_news_digest::store::ContentStore;
use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct ScoreByOrder {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait::async_trait]
impl Ranker for ScoreByOrder {
    async fn rank(
        &self,
        _profile: &UserProfile,
        candidates: &[RankCandidate],
    ) -> Result<Vec<RankedEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("ranking model down");
        }
        Ok(candidates
            .iter()
            .enumerate()
            .map(|(i, c)| RankedEntry {
                digest_id: c.id.clone(),
                score: 9.0 - i as f32,
                rank: i as u32 + 1,
                reasoning: "fits the profile".to_string(),
            })
            .collect())
    }
}

struct StalledRanker;

#[async_trait::async_trait]
impl Ranker for StalledRanker {
    async fn rank(
        &self,
        _profile: &UserProfile,
        candidates: &[RankCandidate],
    ) -> Result<Vec<RankedEntry>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(candidates
            .iter()
            .map(|c| RankedEntry {
                digest_id: c.id.clone(),
                score: 5.0,
                rank: 1,
                reasoning: String::new(),
            })
            .collect())
    }
}

struct MockIntro {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait::async_trait]
impl IntroGenerator for MockIntro {
    async fn generate_intro(
        &self,
        profile: &UserProfile,
        _top_articles: &[RankedArticle],
    ) -> Result<EmailIntro> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("intro model down");
        }
        Ok(EmailIntro {
            greeting: format!("Hey {}!", profile.name),
            body: "Fresh picks below.".to_string(),
        })
    }
}

#[derive(Default)]
struct CapturingNotifier {
    sends: AtomicUsize,
    last: Mutex<Option<(String, String, String, Vec<String>)>>,
}

#[async_trait::async_trait]
impl Notifier for CapturingNotifier {
    async fn send(
        &self,
        subject: &str,
        plain_body: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((
            subject.to_string(),
            plain_body.to_string(),
            html_body.to_string(),
            recipients.to_vec(),
        ));
        Ok(())
    }
}

async fn store_with_digests(n: usize) -> ContentStore {
    let store = ContentStore::open_in_memory().await.unwrap();
    store.init_schema().await.unwrap();
    for i in 0..n {
        store
            .create_digest(
                ContentKind::Openai,
                &format!("a{i}"),
                &format!("https://example.test/a{i}"),
                &format!("Digest {i}"),
                "Summary.",
                Utc::now(),
            )
            .await
            .unwrap();
    }
    store
}

fn profile() -> UserProfile {
    UserProfile {
        name: "Alex".to_string(),
        ..UserProfile::default()
    }
}

fn recipients() -> Vec<String> {
    vec!["alex@example.test".to_string()]
}

#[tokio::test]
async fn empty_window_skips_before_any_generation_call() {
    let store = store_with_digests(0).await;
    let ranker = Arc::new(ScoreByOrder {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let intro = Arc::new(MockIntro {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let notifier = Arc::new(CapturingNotifier::default());

    let stats = run_delivery(
        &store,
        ranker.clone(),
        intro.clone(),
        notifier.clone(),
        &profile(),
        &recipients(),
        24,
        10,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(stats.skipped_no_content);
    assert!(!stats.sent);
    assert_eq!(ranker.calls.load(Ordering::SeqCst), 0);
    assert_eq!(intro.calls.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn top_n_bounds_the_email_but_not_the_ranking() {
    let store = store_with_digests(5).await;
    let ranker = Arc::new(ScoreByOrder {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let intro = Arc::new(MockIntro {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let notifier = Arc::new(CapturingNotifier::default());

    let stats = run_delivery(
        &store,
        ranker,
        intro,
        notifier.clone(),
        &profile(),
        &recipients(),
        24,
        2,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(stats.sent);
    assert_eq!(stats.total_ranked, 5);
    assert_eq!(stats.shown, 2);
    assert!(stats.subject.as_deref().unwrap().starts_with("Daily AI News Digest - "));

    let last = notifier.last.lock().unwrap();
    let (subject, plain, html, to) = last.as_ref().unwrap();
    assert_eq!(subject, stats.subject.as_deref().unwrap());
    assert_eq!(to, &recipients());
    assert!(plain.contains("## 1. "));
    assert!(plain.contains("## 2. "));
    assert!(!plain.contains("## 3. "));
    assert!(html.contains("<h1>Hey Alex!</h1>"));
}

#[tokio::test]
async fn intro_failure_falls_back_without_blocking_delivery() {
    let store = store_with_digests(2).await;
    let ranker = Arc::new(ScoreByOrder {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let intro = Arc::new(MockIntro {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let notifier = Arc::new(CapturingNotifier::default());

    let stats = run_delivery(
        &store,
        ranker,
        intro,
        notifier.clone(),
        &profile(),
        &recipients(),
        24,
        10,
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    assert!(stats.sent);
    let last = notifier.last.lock().unwrap();
    let (_, plain, _, _) = last.as_ref().unwrap();
    assert!(plain.starts_with("Hey Alex!"));
    assert!(plain.contains("Here's your personalized AI news digest for today."));
}

#[tokio::test]
async fn ranking_timeout_aborts_without_sending() {
    let store = store_with_digests(3).await;
    let intro = Arc::new(MockIntro {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let notifier = Arc::new(CapturingNotifier::default());

    let err = run_delivery(
        &store,
        Arc::new(StalledRanker),
        intro.clone(),
        notifier.clone(),
        &profile(),
        &recipients(),
        24,
        10,
        Duration::from_millis(50),
    )
    .await
    .unwrap_err();

    // A timeout is the same stage failure as a ranker error.
    assert!(format!("{err:#}").contains("timed out"), "got: {err:#}");
    assert_eq!(intro.calls.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn total_ranking_failure_aborts_without_sending() {
    let store = store_with_digests(3).await;
    let ranker = Arc::new(ScoreByOrder {
        calls: AtomicUsize::new(0),
        fail: true,
    });
    let intro = Arc::new(MockIntro {
        calls: AtomicUsize::new(0),
        fail: false,
    });
    let notifier = Arc::new(CapturingNotifier::default());

    let err = run_delivery(
        &store,
        ranker,
        intro.clone(),
        notifier.clone(),
        &profile(),
        &recipients(),
        24,
        10,
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();

    assert!(format!("{err:#}").contains("ranking"));
    assert_eq!(intro.calls.load(Ordering::SeqCst), 0);
    assert_eq!(notifier.sends.load(Ordering::SeqCst), 0);
}
