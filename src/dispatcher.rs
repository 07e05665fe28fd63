//! Periodic dispatcher jobs using apalis
//!
//! Four cron-fed jobs share one monitor: publishing due scheduled tweets,
//! refreshing engagement metrics for recently posted tweets, materializing
//! campaign slots into scheduled tweets, and purging expired refresh
//! tokens. Every job commits per item, so one bad tweet or campaign never
//! takes down the rest of a cycle.

use apalis::prelude::*;
use apalis_cron::{CronStream, Schedule};
use apalis_sql::postgres::PostgresStorage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use std::str::FromStr;

use crate::constants::{DEFAULT_METRICS_BATCH_SIZE, DEFAULT_METRICS_WINDOW_DAYS};
use crate::domain::models::{
    Campaign, CampaignSlot, DueTweet, PostedTweetRef, TweetStatus, engagement_rate,
};
use crate::domain::queries::{campaigns, metrics, tweets, users};
use crate::services::ai::{AiGenerator, GenerationRequest};
use crate::services::publisher::PublisherClient;
use crate::services::session;

const DEFAULT_DUE_POST_SCHEDULE: &str = "0 * * * * *";
const DEFAULT_METRICS_SCHEDULE: &str = "0 */5 * * * *";
const DEFAULT_CAMPAIGN_SCHEDULE: &str = "0 0 * * * *";
const DEFAULT_SESSION_CLEANUP_SCHEDULE: &str = "0 0 0 * * *";

/// Job input - marker for the due-tweet publishing sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuePostJob {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for DuePostJob {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        DuePostJob { scheduled_at: dt }
    }
}

/// Job input - marker for the metrics refresh sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRefreshJob {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for MetricsRefreshJob {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        MetricsRefreshJob { scheduled_at: dt }
    }
}

/// Job input - marker for the campaign materialization sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignJob {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for CampaignJob {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        CampaignJob { scheduled_at: dt }
    }
}

/// Job input - marker for the refresh-token purge sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCleanupJob {
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

impl From<chrono::DateTime<chrono::Utc>> for SessionCleanupJob {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        SessionCleanupJob { scheduled_at: dt }
    }
}

/// Shared context for all dispatcher jobs
#[derive(Clone)]
pub struct DispatcherContext {
    pub pool: PgPool,
    pub publisher: PublisherClient,
    pub ai: Option<AiGenerator>,
}

// ============================================================================
// Due tweet publishing
// ============================================================================

/// Job handler - publishes every scheduled tweet whose time has come.
/// Always returns Ok - per-tweet failures are recorded on the tweet itself.
async fn process_due_tweets(_job: DuePostJob, ctx: Data<DispatcherContext>) -> Result<(), Error> {
    let due = match tweets::due_scheduled_tweets(&ctx.pool, Utc::now()).await {
        Ok(due) => due,
        Err(e) => {
            eprintln!("[dispatcher] Due-tweet scan error (will retry): {}", e);
            return Ok(());
        }
    };

    if due.is_empty() {
        return Ok(());
    }

    let mut posted = 0;
    let mut failed = 0;
    for tweet in due {
        match publish_one(&ctx, &tweet).await {
            Ok(()) => posted += 1,
            Err(()) => failed += 1,
        }
    }

    println!(
        "[dispatcher] Publish sweep complete: {} posted, {} failed",
        posted, failed
    );
    Ok(())
}

async fn publish_one(ctx: &DispatcherContext, tweet: &DueTweet) -> Result<(), ()> {
    let api_key = match users::get_api_key(&ctx.pool, tweet.user_id).await {
        Ok(Some(key)) => key,
        Ok(None) => {
            // Stays scheduled; it will publish once the user adds a key
            eprintln!(
                "[dispatcher] Tweet {} skipped: user {} has no API key",
                tweet.id, tweet.user_id
            );
            return Err(());
        }
        Err(e) => {
            eprintln!(
                "[dispatcher] API key lookup failed for tweet {}: {}",
                tweet.id, e
            );
            return Err(());
        }
    };

    match ctx
        .publisher
        .post_tweet(&api_key, &tweet.text, &tweet.media_links.0)
        .await
    {
        Ok(published) => {
            match tweets::mark_tweet_posted(&ctx.pool, tweet.id, &published.id).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    // Someone posted it between the scan and now; the platform
                    // copy stands, nothing to undo
                    eprintln!(
                        "[dispatcher] Tweet {} was already posted concurrently",
                        tweet.id
                    );
                    Ok(())
                }
                Err(e) => {
                    eprintln!(
                        "[dispatcher] CRITICAL: Tweet {} published as {} but status update failed: {}",
                        tweet.id, published.id, e
                    );
                    Err(())
                }
            }
        }
        Err(e) => {
            eprintln!("[dispatcher] Publish failed for tweet {}: {}", tweet.id, e);
            mark_failed_logged(&ctx.pool, tweet.id).await;
            Err(())
        }
    }
}

async fn mark_failed_logged(pool: &PgPool, tweet_id: i64) {
    if let Err(e) = tweets::mark_tweet_failed(pool, tweet_id).await {
        eprintln!(
            "[dispatcher] Failed to mark tweet {} as failed: {}",
            tweet_id, e
        );
    }
}

// ============================================================================
// Metrics refresh
// ============================================================================

/// Job handler - appends a fresh engagement snapshot for recently posted
/// tweets. Always returns Ok - per-tweet fetch failures are logged and the
/// sweep moves on.
async fn refresh_metrics(
    _job: MetricsRefreshJob,
    ctx: Data<DispatcherContext>,
) -> Result<(), Error> {
    let batch = match tweets::recently_posted_tweets(
        &ctx.pool,
        metrics_window_days(),
        metrics_batch_size(),
    )
    .await
    {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("[dispatcher] Metrics scan error (will retry): {}", e);
            return Ok(());
        }
    };

    if batch.is_empty() {
        return Ok(());
    }

    let mut refreshed = 0;
    let mut failed = 0;
    for tweet in batch {
        match snapshot_one(&ctx, &tweet).await {
            Ok(()) => refreshed += 1,
            Err(()) => failed += 1,
        }
    }

    println!(
        "[dispatcher] Metrics sweep complete: {} refreshed, {} failed",
        refreshed, failed
    );
    Ok(())
}

async fn snapshot_one(ctx: &DispatcherContext, tweet: &PostedTweetRef) -> Result<(), ()> {
    let api_key = match users::get_api_key(&ctx.pool, tweet.user_id).await {
        Ok(Some(key)) => key,
        Ok(None) => {
            // Key was removed after posting; nothing to fetch with
            return Err(());
        }
        Err(e) => {
            eprintln!(
                "[dispatcher] API key lookup failed for tweet {}: {}",
                tweet.id, e
            );
            return Err(());
        }
    };

    let counts = match ctx
        .publisher
        .get_tweet_metrics(&api_key, &tweet.twitter_id)
        .await
    {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!(
                "[dispatcher] Metrics fetch failed for tweet {}: {}",
                tweet.id, e
            );
            return Err(());
        }
    };

    let rate = engagement_rate(
        counts.likes,
        counts.retweets,
        counts.replies,
        counts.impressions,
    );

    if let Err(e) = metrics::insert_metric(
        &ctx.pool,
        tweet.id,
        counts.likes,
        counts.retweets,
        counts.replies,
        counts.impressions,
        rate,
    )
    .await
    {
        eprintln!(
            "[dispatcher] Snapshot insert failed for tweet {}: {}",
            tweet.id, e
        );
        return Err(());
    }

    Ok(())
}

// ============================================================================
// Campaign materialization
// ============================================================================

/// Job handler - turns due campaign slots into scheduled tweets.
/// Always returns Ok - per-campaign failures are logged and skipped.
async fn materialize_campaigns(_job: CampaignJob, ctx: Data<DispatcherContext>) -> Result<(), Error> {
    let active = match campaigns::active_campaigns(&ctx.pool).await {
        Ok(active) => active,
        Err(e) => {
            eprintln!("[dispatcher] Campaign scan error (will retry): {}", e);
            return Ok(());
        }
    };

    let mut created = 0;
    for campaign in &active {
        match materialize_one(&ctx, campaign).await {
            Ok(n) => created += n,
            Err(e) => {
                eprintln!(
                    "[dispatcher] Campaign {} materialization failed: {}",
                    campaign.id, e
                );
            }
        }
    }

    if created > 0 {
        println!(
            "[dispatcher] Campaign sweep complete: {} tweets scheduled",
            created
        );
    }
    Ok(())
}

/// Materialize one campaign's due slots in time order. Each slot becomes
/// exactly one scheduled tweet; the watermark advances to the latest
/// materialized slot time so a slot never fires twice across cycles.
/// A slot whose copy cannot be produced stops the cycle for this campaign
/// so the watermark never passes it and it retries next cycle.
async fn materialize_one(
    ctx: &DispatcherContext,
    campaign: &Campaign,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let due = due_slots(campaign);

    if due.is_empty() {
        return Ok(0);
    }

    let mut created = 0;
    let mut watermark = campaign.last_materialized_at;

    for slot in due {
        let text = match slot_text(ctx.ai.as_ref(), &slot.topic, &slot.tone).await {
            Some(text) => text,
            None => {
                eprintln!(
                    "[dispatcher] Campaign {} slot \"{}\" skipped, will retry next cycle",
                    campaign.id, slot.topic
                );
                break;
            }
        };

        let scheduled_at = slot.scheduled_at;
        tweets::create_tweet(
            &ctx.pool,
            tweets::NewTweet {
                user_id: campaign.user_id,
                campaign_id: Some(campaign.id),
                text: &text.0,
                media_links: &[],
                status: TweetStatus::Scheduled,
                scheduled_at,
                generated_by_ai: text.1,
                viral_score: text.2,
            },
        )
        .await?;

        created += 1;
        if watermark.is_none() || scheduled_at > watermark {
            watermark = scheduled_at;
        }
    }

    if created > 0 {
        if let Some(mark) = watermark {
            campaigns::set_last_materialized(&ctx.pool, campaign.id, mark).await?;
        }
    }

    Ok(created)
}

/// Slots due for materialization, earliest first
fn due_slots(campaign: &Campaign) -> Vec<&CampaignSlot> {
    let mut due: Vec<_> = campaign
        .slots
        .0
        .iter()
        .filter(|slot| slot.is_due(campaign.last_materialized_at))
        .collect();
    due.sort_by_key(|slot| slot.scheduled_at);
    due
}

/// Copy for a slot: the generator's best variant when one is configured, a
/// plain templated line when no generator exists at all. A configured
/// generator that fails (or returns nothing) yields None - placeholder text
/// must never reach the user's account.
async fn slot_text(
    ai: Option<&AiGenerator>,
    topic: &str,
    tone: &str,
) -> Option<(String, bool, Option<f64>)> {
    let Some(generator) = ai else {
        return Some((format!("Thoughts on {}", topic), false, None));
    };

    let req = GenerationRequest {
        topic: topic.to_string(),
        tone: tone.to_string(),
        count: 1,
        include_hashtags: false,
        include_call_to_action: false,
    };
    match generator.generate_variants(&req).await {
        Ok(variants) => variants
            .into_iter()
            .next()
            .map(|best| (best.text, true, Some(best.viral_score))),
        Err(e) => {
            eprintln!("[dispatcher] Generation failed for \"{}\": {}", topic, e);
            None
        }
    }
}

// ============================================================================
// Session cleanup
// ============================================================================

/// Job handler - deletes refresh tokens past their expiry. Always returns
/// Ok - a failed purge just waits for the next cycle.
async fn cleanup_sessions(
    _job: SessionCleanupJob,
    ctx: Data<DispatcherContext>,
) -> Result<(), Error> {
    match session::cleanup_expired_tokens(&ctx.pool).await {
        Ok(0) => {}
        Ok(deleted) => {
            println!("[dispatcher] Purged {} expired refresh tokens", deleted);
        }
        Err(e) => {
            eprintln!("[dispatcher] Refresh token purge failed: {}", e);
        }
    }
    Ok(())
}

// ============================================================================
// Worker wiring
// ============================================================================

/// Start all dispatcher workers. Blocks until the monitor exits.
pub async fn run_dispatcher(pool: PgPool, publisher: PublisherClient, ai: Option<AiGenerator>) {
    let ctx = DispatcherContext {
        pool: pool.clone(),
        publisher,
        ai,
    };

    // Run apalis migrations
    PostgresStorage::setup(&pool)
        .await
        .expect("Failed to set up apalis storage");

    let due_schedule = schedule_from_env("DUE_POST_SCHEDULE", DEFAULT_DUE_POST_SCHEDULE);
    let metrics_schedule = schedule_from_env("METRICS_SCHEDULE", DEFAULT_METRICS_SCHEDULE);
    let campaign_schedule = schedule_from_env("CAMPAIGN_SCHEDULE", DEFAULT_CAMPAIGN_SCHEDULE);
    let cleanup_schedule =
        schedule_from_env("SESSION_CLEANUP_SCHEDULE", DEFAULT_SESSION_CLEANUP_SCHEDULE);

    let due_storage: PostgresStorage<DuePostJob> = PostgresStorage::new(pool.clone());
    let due_backend = CronStream::new(due_schedule).pipe_to_storage(due_storage);

    let metrics_storage: PostgresStorage<MetricsRefreshJob> = PostgresStorage::new(pool.clone());
    let metrics_backend = CronStream::new(metrics_schedule).pipe_to_storage(metrics_storage);

    let campaign_storage: PostgresStorage<CampaignJob> = PostgresStorage::new(pool.clone());
    let campaign_backend = CronStream::new(campaign_schedule).pipe_to_storage(campaign_storage);

    let cleanup_storage: PostgresStorage<SessionCleanupJob> = PostgresStorage::new(pool.clone());
    let cleanup_backend = CronStream::new(cleanup_schedule).pipe_to_storage(cleanup_storage);

    println!("[dispatcher] Apalis workers starting (publish, metrics, campaigns, sessions)");

    let due_worker = WorkerBuilder::new("due-post-worker")
        .data(ctx.clone())
        .backend(due_backend)
        .build_fn(process_due_tweets);

    let metrics_worker = WorkerBuilder::new("metrics-refresh-worker")
        .data(ctx.clone())
        .backend(metrics_backend)
        .build_fn(refresh_metrics);

    let campaign_worker = WorkerBuilder::new("campaign-worker")
        .data(ctx.clone())
        .backend(campaign_backend)
        .build_fn(materialize_campaigns);

    let cleanup_worker = WorkerBuilder::new("session-cleanup-worker")
        .data(ctx)
        .backend(cleanup_backend)
        .build_fn(cleanup_sessions);

    Monitor::new()
        .register(due_worker)
        .register(metrics_worker)
        .register(campaign_worker)
        .register(cleanup_worker)
        .run()
        .await
        .expect("Dispatcher monitor failed");
}

fn schedule_from_env(var: &str, default: &str) -> Schedule {
    let expr = env::var(var).unwrap_or_else(|_| default.to_string());
    match Schedule::from_str(&expr) {
        Ok(schedule) => schedule,
        Err(e) => {
            eprintln!(
                "[dispatcher] Invalid {} \"{}\" ({}), using default",
                var, expr, e
            );
            Schedule::from_str(default).expect("Invalid default schedule")
        }
    }
}

fn metrics_batch_size() -> i64 {
    env::var("METRICS_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_METRICS_BATCH_SIZE)
}

fn metrics_window_days() -> i64 {
    env::var("METRICS_WINDOW_DAYS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_METRICS_WINDOW_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::DEFAULT_GEMINI_MODEL;
    use chrono::{DateTime, Duration};
    use sqlx::types::Json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn slot(topic: &str, at: Option<DateTime<Utc>>) -> CampaignSlot {
        CampaignSlot {
            topic: topic.to_string(),
            tone: "professional".to_string(),
            scheduled_at: at,
        }
    }

    fn campaign(slots: Vec<CampaignSlot>, watermark: Option<DateTime<Utc>>) -> Campaign {
        Campaign {
            id: 1,
            user_id: 1,
            name: "launch".to_string(),
            description: None,
            recurrence: None,
            slots: Json(slots),
            active: true,
            last_materialized_at: watermark,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_schedules_parse() {
        for expr in [
            DEFAULT_DUE_POST_SCHEDULE,
            DEFAULT_METRICS_SCHEDULE,
            DEFAULT_CAMPAIGN_SCHEDULE,
            DEFAULT_SESSION_CLEANUP_SCHEDULE,
        ] {
            assert!(Schedule::from_str(expr).is_ok(), "bad schedule {}", expr);
        }
    }

    #[test]
    fn test_due_slots_sorted_earliest_first() {
        let now = Utc::now();
        let c = campaign(
            vec![
                slot("late", Some(now + Duration::hours(3))),
                slot("never", None),
                slot("early", Some(now + Duration::hours(1))),
                slot("done", Some(now - Duration::hours(1))),
            ],
            Some(now),
        );

        let due = due_slots(&c);
        let topics: Vec<_> = due.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, ["early", "late"]);
    }

    #[tokio::test]
    async fn test_slot_text_without_generator_uses_template() {
        let text = slot_text(None, "rust tips", "casual").await.unwrap();
        assert_eq!(text.0, "Thoughts on rust tips");
        assert!(!text.1);
        assert!(text.2.is_none());
    }

    #[tokio::test]
    async fn test_slot_text_generator_failure_skips_slot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let generator = AiGenerator::new("test-key", DEFAULT_GEMINI_MODEL, &server.uri());
        // A configured generator that fails must not fall back to template copy
        let text = slot_text(Some(&generator), "rust tips", "casual").await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_slot_text_generator_success() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "[{\"text\": \"Rust tip of the day\", \"viral_score\": 0.8}]"
                    }]
                }
            }]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let generator = AiGenerator::new("test-key", DEFAULT_GEMINI_MODEL, &server.uri());
        let text = slot_text(Some(&generator), "rust tips", "casual")
            .await
            .unwrap();
        assert_eq!(text.0, "Rust tip of the day");
        assert!(text.1);
        assert_eq!(text.2, Some(0.8));
    }
}
