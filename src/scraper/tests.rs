use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_test::traced_test;

use super::sources::{game8, reddit, twitter};
use super::*;
use crate::codes::{CodeStatus, RewardType};
use crate::config::{Game8Config, RedditConfig, Settings, TwitterAccount, TwitterConfig};
use crate::error::{Error, FetchError, ParseError};

const C1: &str = "WKXBT-3W5K9-RBKJ5-3BBT3-5B5H3";
const C2: &str = "ZFKTB-W9XXK-C6RJK-6T3T3-RCS5H";
const C3: &str = "KBKTB-R3H3K-XBKJK-JT3T3-WC959";
const C4: &str = "T9RJB-JTCBT-ZFK3B-3BJJT-ZB6T6";
const C5: &str = "HRKBJ-5SFWB-XZJ3T-3B3TT-6W5JZ";
const C6: &str = "JS53B-6XKBT-9JT3B-3BJTJ-F63TR";
const C7: &str = "3XRBT-3CB5C-TZ3TB-JTJJ3-B69CR";

const GAME8_PAGE: &str = r#"<html><body>
<h2>Borderlands 4 SHiFT Codes</h2>
<table class="a-table">
  <tr><th>Code</th><th>Reward</th><th>Availability</th></tr>
  <tr><td><b>WKXBT-3W5K9-RBKJ5-3BBT3-5B5H3</b></td><td>3 Golden Keys</td><td>Until 12/31/2026</td></tr>
  <tr><td>HRKBJ-5SFWB-XZJ3T-3B3TT-6W5JZ</td><td>Vault Hunter Skin</td><td>Expired</td></tr>
  <tr><td>JS53B-6XKBT-9JT3B-3BJTJ-F63TR</td><td> </td><td>Unknown</td></tr>
</table>
<p>Also try 3XRBT-3CB5C-TZ3TB-JTJJ3-B69CR this week.</p>
</body></html>"#;

const REDDIT_HOT: &str = r#"{
  "kind": "Listing",
  "data": {
    "after": null,
    "children": [
      {"kind": "t3", "data": {
        "id": "a1",
        "title": "[BL4] 3 Golden Keys - expires 10/25",
        "selftext": "Code: WKXBT-3W5K9-RBKJ5-3BBT3-5B5H3",
        "permalink": "/r/Borderlandsshiftcodes/comments/a1/",
        "created_utc": 1792281600.0,
        "ups": 120,
        "link_flair_text": null
      }},
      {"kind": "t3", "data": {
        "id": "a2",
        "title": "Borderlands 2: Skeleton Key",
        "selftext": "ZFKTB-W9XXK-C6RJK-6T3T3-RCS5H",
        "permalink": "/r/Borderlandsshiftcodes/comments/a2/",
        "created_utc": 1791590400.0,
        "ups": 5,
        "link_flair_text": "Expired"
      }}
    ]
  }
}"#;

const REDDIT_NEW: &str = r#"{
  "kind": "Listing",
  "data": {
    "children": [
      {"kind": "t3", "data": {
        "id": "a3",
        "title": "Golden key code",
        "selftext": "WKXBT-3W5K9-RBKJ5-3BBT3-5B5H3 is back, 5 golden keys",
        "permalink": "/r/Borderlandsshiftcodes/comments/a3/",
        "created_utc": 1792022400.0,
        "ups": 300
      }},
      {"kind": "t3", "data": {
        "id": "a2",
        "title": "Borderlands 3: Skeleton Key (edited)",
        "selftext": "ZFKTB-W9XXK-C6RJK-6T3T3-RCS5H",
        "permalink": "/r/Borderlandsshiftcodes/comments/a2/",
        "created_utc": 1791590400.0,
        "ups": 999
      }}
    ]
  }
}"#;

const TIMELINE: &str = r#"{
  "data": [
    {"id": "1", "text": "New SHiFT code for Borderlands 4: KBKTB-R3H3K-XBKJK-JT3T3-WC959 - 5 Golden Keys, expires 10/31", "created_at": "2026-10-17T16:00:00.000Z"},
    {"id": "2", "text": "Redeem T9RJB-JTCBT-ZFK3B-3BJJT-ZB6T6 for a free skin!", "created_at": "2026-10-16T12:00:00.000Z"},
    {"id": "3", "text": "Join the stream tonight", "created_at": "2026-10-15T20:00:00.000Z"}
  ],
  "meta": {"result_count": 3}
}"#;

const STORE: &str = r#"export const mockShiftCodes: ShiftCode[] = [
  {
    id: 'reddit-bl4-wkxbt3w5k9',
    code: 'KBKTB-R3H3K-XBKJK-JT3T3-WC959',
    game: 'BL4',
    status: 'active',
    reward: '5 Golden Keys',
    rewardType: 'golden-keys',
    keys: 5,
    source: 'Twitter Borderlands',
    addedAt: '2026-09-01',
    expiresAt: '2026-09-30',
    isUniversal: false,
  },
];
"#;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn account() -> TwitterAccount {
    TwitterAccount {
        username: "Borderlands".into(),
        display_name: "Borderlands".into(),
    }
}

fn reddit_posts() -> Vec<reddit::Post> {
    let mut posts = reddit::parse_listing("hot", REDDIT_HOT).unwrap();
    posts.extend(reddit::parse_listing("new", REDDIT_NEW).unwrap());
    posts
}

fn tweets() -> Vec<twitter::Tweet> {
    twitter::parse_timeline("timeline", TIMELINE).unwrap()
}

fn find<'a>(codes: &'a [ScrapedCode], code: &str) -> &'a CodeRecord {
    &codes
        .iter()
        .find(|c| c.code() == code)
        .unwrap_or_else(|| panic!("{code} not found"))
        .record
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_store(content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "shift-codes-scraper-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("shiftCodes.ts");
    std::fs::write(&path, content).unwrap();
    path
}

fn settings_for(path: PathBuf) -> Settings {
    let mut settings = Settings::default();
    settings.store.path = path;
    settings.sources.twitter.bearer_token_env = "SHIFT_CODES_TEST_TOKEN_THAT_IS_NEVER_SET".into();
    settings
}

fn global_for(path: PathBuf) -> Arc<Global> {
    Global::init(settings_for(path)).unwrap()
}

/// Talks to the local servers below only, whatever proxy the environment sets.
fn local_global(config: Settings) -> Arc<Global> {
    let http_client = reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap();
    Arc::new(Global { config, http_client })
}

#[derive(Clone)]
struct Route {
    path: &'static str,
    status: u16,
    body: &'static str,
}

fn route(path: &'static str, status: u16, body: &'static str) -> Route {
    Route { path, status, body }
}

/// Serves canned responses by path until the test ends. Unknown paths get a 404.
async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, routes.clone()));
        }
    });

    format!("http://{addr}")
}

async fn respond(mut stream: tokio::net::TcpStream, routes: Vec<Route>) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&request);
    let target = request.split_whitespace().nth(1).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target);

    let (status, body) = routes
        .iter()
        .find(|r| r.path == path)
        .map(|r| (r.status, r.body))
        .unwrap_or((404, "not found"));

    let response = format!(
        "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// An address nothing listens on.
async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn game8_table_rows() {
    let profile = game8::profile(&Game8Config::default());
    let codes = game8::parse_html(GAME8_PAGE, &profile, today());

    let order: Vec<&str> = codes.iter().map(|c| c.code()).collect();
    assert_eq!(order, vec![C1, C5, C6, C7]);

    let keys = find(&codes, C1);
    assert_eq!(keys.game, Game::Bl4);
    assert_eq!(keys.reward, "3 Golden Keys");
    assert_eq!(keys.reward_type, RewardType::GoldenKeys);
    assert_eq!(keys.keys, Some(3));
    assert_eq!(keys.expires_at, Some(ymd(2026, 12, 31)));
    assert_eq!(keys.status, CodeStatus::Active);
    assert_eq!(keys.source, "game8.co");
    assert_eq!(keys.last_verified_at, Some(today()));
    assert!(keys.is_universal);

    let skin = find(&codes, C5);
    assert_eq!(skin.reward_type, RewardType::Skin);
    assert_eq!(skin.keys, None);
    assert_eq!(skin.status, CodeStatus::Expired);
    assert_eq!(skin.expires_at, None);

    let blank = find(&codes, C6);
    assert_eq!(blank.reward, "SHiFT Reward");
    assert_eq!(blank.reward_type, RewardType::Other);
    assert_eq!(blank.status, CodeStatus::Active);
}

#[test]
fn game8_codes_outside_the_table_are_unknown() {
    let profile = game8::profile(&Game8Config::default());
    let codes = game8::parse_html(GAME8_PAGE, &profile, today());

    let loose = find(&codes, C7);
    assert_eq!(loose.reward, "SHiFT Reward (from game8.co)");
    assert_eq!(loose.status, CodeStatus::Unknown);
    assert_eq!(loose.game, Game::Bl4);
}

#[test]
fn game8_page_without_codes() {
    let profile = game8::profile(&Game8Config::default());
    let codes = game8::parse_html("<html><body><p>Nothing yet</p></body></html>", &profile, today());
    assert!(codes.is_empty());
}

#[test]
fn reddit_posts_are_deduped_and_newest_first() {
    let profile = reddit::profile(&RedditConfig::default());
    let codes = reddit::codes_from_posts(&reddit_posts(), &profile, today());

    let order: Vec<&str> = codes.iter().map(|c| c.code()).collect();
    assert_eq!(order, vec![C1, C2]);

    // a3 has more upvotes than a1
    let golden = find(&codes, C1);
    assert_eq!(golden.keys, Some(5));
    assert_eq!(golden.reward, "5 Golden Keys");
    assert_eq!(golden.added_at, ymd(2026, 10, 15));
    assert_eq!(golden.game, Game::Bl4);
    assert_eq!(golden.source, "r/Borderlandsshiftcodes");
    assert_eq!(codes[0].score, Some(300));

    // the second copy of post a2 is ignored, so its title doesn't move the game
    let skeleton = find(&codes, C2);
    assert_eq!(skeleton.game, Game::Bl2);
    assert_eq!(skeleton.reward_type, RewardType::SkeletonKeys);
    assert_eq!(skeleton.keys, Some(1));
    assert_eq!(skeleton.reward, "1 Skeleton Key");
    assert_eq!(skeleton.status, CodeStatus::Expired);
    assert_eq!(skeleton.added_at, ymd(2026, 10, 10));
}

#[test]
fn reddit_title_decides_game_and_text_decides_expiry() {
    let profile = reddit::profile(&RedditConfig::default());
    let posts = reddit::parse_listing("hot", REDDIT_HOT).unwrap();
    let codes = reddit::codes_from_posts(&posts, &profile, today());

    let record = find(&codes, C1);
    assert_eq!(record.game, Game::Bl4);
    assert_eq!(record.keys, Some(3));
    assert_eq!(record.expires_at, Some(ymd(2026, 10, 25)));
    assert_eq!(record.status, CodeStatus::Active);
    assert!(record.is_universal);
}

#[test]
fn reddit_posting_dates_are_not_expirations() {
    let body = r#"{"kind": "Listing", "data": {"children": [
        {"kind": "t3", "data": {
            "id": "b1",
            "title": "[BL4] 3 Golden Keys",
            "selftext": "Posted 10/01/2026 for the October 12, 2026 stream. Code: WKXBT-3W5K9-RBKJ5-3BBT3-5B5H3",
            "permalink": "/r/Borderlandsshiftcodes/comments/b1/",
            "created_utc": 1792281600.0,
            "ups": 10
        }}
    ]}}"#;
    let posts = reddit::parse_listing("hot", body).unwrap();
    let codes = reddit::codes_from_posts(&posts, &reddit::profile(&RedditConfig::default()), today());

    let record = find(&codes, C1);
    assert_eq!(record.expires_at, None);
    assert_eq!(record.status, CodeStatus::Active);
}

#[test]
fn reddit_rejects_non_listing_bodies() {
    let err = reddit::parse_listing("hot", "<html>too many requests</html>").unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::Feed { .. })));
}

#[test]
fn twitter_keeps_only_shift_tweets() {
    assert!(twitter::is_shift_tweet("Redeem this now"));
    assert!(twitter::is_shift_tweet(&format!("here: {C4}")));
    assert!(!twitter::is_shift_tweet("Join the stream tonight"));

    let config = TwitterConfig::default();
    let codes = twitter::codes_from_tweets(&tweets(), &twitter::profile(&config, &account()), today());

    let order: Vec<&str> = codes.iter().map(|c| c.code()).collect();
    assert_eq!(order, vec![C3, C4]);
}

#[test]
fn twitter_universal_only_without_game() {
    let config = TwitterConfig::default();
    let codes = twitter::codes_from_tweets(&tweets(), &twitter::profile(&config, &account()), today());

    let named = find(&codes, C3);
    assert_eq!(named.game, Game::Bl4);
    assert!(!named.is_universal);
    assert_eq!(named.keys, Some(5));
    assert_eq!(named.expires_at, Some(ymd(2026, 10, 31)));
    assert_eq!(named.status, CodeStatus::Active);
    assert_eq!(named.source, "Twitter Borderlands");
    assert_eq!(named.added_at, ymd(2026, 10, 17));
    assert_eq!(named.last_verified_at, None);

    let generic = find(&codes, C4);
    assert_eq!(generic.game, Game::Bl3);
    assert!(generic.is_universal);
    assert_eq!(generic.reward_type, RewardType::Skin);
    assert_eq!(generic.keys, None);
    assert_eq!(generic.status, CodeStatus::Unknown);
}

#[test]
fn twitter_event_dates_are_not_expirations() {
    let timeline = r#"{"data": [
        {"id": "9", "text": "Borderlands 4 dev stream on October 12, 2026! Redeem T9RJB-JTCBT-ZFK3B-3BJJT-ZB6T6", "created_at": "2026-10-18T16:00:00.000Z"}
    ]}"#;
    let tweets = twitter::parse_timeline("timeline", timeline).unwrap();
    let codes = twitter::codes_from_tweets(&tweets, &twitter::profile(&TwitterConfig::default(), &account()), today());

    let record = find(&codes, C4);
    assert_eq!(record.expires_at, None);
    assert_eq!(record.status, CodeStatus::Unknown);
}

#[test]
fn twitter_empty_timeline() {
    let tweets = twitter::parse_timeline("timeline", r#"{"meta": {"result_count": 0}}"#).unwrap();
    assert!(tweets.is_empty());
}

#[test]
fn plan_merges_all_sources_against_the_store() {
    let path = temp_store(STORE);
    let store = Store::load(&path, crate::store::DEFAULT_MARKER).unwrap();

    let mut batch = game8::parse_html(GAME8_PAGE, &game8::profile(&Game8Config::default()), today());
    batch.extend(reddit::codes_from_posts(
        &reddit_posts(),
        &reddit::profile(&RedditConfig::default()),
        today(),
    ));
    batch.extend(twitter::codes_from_tweets(
        &tweets(),
        &twitter::profile(&TwitterConfig::default(), &account()),
        today(),
    ));

    let records = plan(&store, batch);

    let order: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(order, vec![C1, C5, C6, C7, C2, C4]);

    // reddit's upvoted copy replaces the game8 row in place
    assert_eq!(records[0].source, "r/Borderlandsshiftcodes");
    assert_eq!(records[0].id.as_deref(), Some("reddit-bl4-wkxbt3w5k9-1"));
    assert_eq!(records[1].id.as_deref(), Some("game8-bl4-hrkbj5sfwb"));
    assert_eq!(records[5].id.as_deref(), Some("twitter-bl3-t9rjbjtcbt"));

    let again = plan(&store, Vec::new());
    assert!(again.is_empty());
}

#[test]
fn summary_counts_per_game() {
    let profile = reddit::profile(&RedditConfig::default());
    let summary = RunSummary {
        added: reddit::codes_from_posts(&reddit_posts(), &profile, today())
            .into_iter()
            .map(|c| c.record)
            .collect(),
        ..Default::default()
    };

    assert_eq!(
        summary.by_game(today()),
        vec![(Game::Bl2, 1, 0), (Game::Bl4, 1, 1)]
    );
}

#[tokio::test]
#[traced_test]
async fn run_without_new_codes_leaves_store_alone() {
    let path = temp_store(STORE);
    let global = global_for(path.clone());

    let summary = run(&global, &RunOptions::default(), today()).await.unwrap();

    assert!(summary.added.is_empty());
    assert!(summary.failed.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), STORE);
    assert!(logs_contain("no new codes found"));
}

#[tokio::test]
async fn run_stops_on_missing_marker() {
    let content = "export const codes = [];\n";
    let path = temp_store(content);
    let global = global_for(path.clone());

    let options = RunOptions {
        sources: vec![SourceKind::Game8],
        dry_run: false,
    };
    let err = run(&global, &options, today()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::Structural(_))
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
}

#[tokio::test]
async fn run_needs_twitter_token() {
    let path = temp_store(STORE);
    let global = global_for(path);

    let options = RunOptions {
        sources: vec![SourceKind::Twitter],
        dry_run: true,
    };
    let err = run(&global, &options, today()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<FetchError>(),
        Some(FetchError::MissingCredential(_))
    ));
}

#[test]
fn expire_rewrites_stale_status() {
    let path = temp_store(STORE);
    let global = global_for(path.clone());

    let preview = expire(&global, today(), true).unwrap();
    assert_eq!(preview.len(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), STORE);

    let stale = expire(&global, today(), false).unwrap();
    assert_eq!(stale[0].code, C3);
    assert_eq!(stale[0].expires_at, ymd(2026, 9, 30));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("status: 'expired'"));
    assert!(expire(&global, today(), false).unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn run_skips_a_failing_source_and_keeps_the_rest() {
    let path = temp_store(STORE);
    let site = serve(vec![route("/borderlands4/codes", 200, GAME8_PAGE)]).await;
    let mut config = settings_for(path.clone());
    config.sources.game8.url = format!("{site}/borderlands4/codes");
    config.sources.reddit.base_url = refused_url().await;
    let global = local_global(config);

    let options = RunOptions {
        sources: vec![SourceKind::Game8, SourceKind::Reddit],
        dry_run: false,
    };
    let summary = run(&global, &options, today()).await.unwrap();

    assert_eq!(summary.failed, vec![SourceKind::Reddit]);
    let added: Vec<&str> = summary.added.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(added, vec![C1, C5, C6, C7]);

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains(C1));
    assert!(written.contains(C3));
    assert!(logs_contain("source skipped"));
}

#[tokio::test]
async fn reddit_keeps_listings_that_answered() {
    let base = serve(vec![
        route("/r/Borderlandsshiftcodes/hot.json", 200, REDDIT_HOT),
        route("/r/Borderlandsshiftcodes/new.json", 500, "upstream error"),
    ])
    .await;
    let mut config = settings_for(temp_store(STORE));
    config.sources.reddit.base_url = base;
    config.sources.reddit.sorts = vec!["hot".into(), "new".into()];
    let global = local_global(config);

    let codes = reddit::scrape(&global, today()).await.unwrap();

    let order: Vec<&str> = codes.iter().map(|c| c.code()).collect();
    assert_eq!(order, vec![C1, C2]);
}

#[tokio::test]
async fn reddit_fails_when_every_listing_fails() {
    let base = serve(vec![
        route("/r/Borderlandsshiftcodes/hot.json", 500, "upstream error"),
        route("/r/Borderlandsshiftcodes/new.json", 500, "upstream error"),
    ])
    .await;
    let mut config = settings_for(temp_store(STORE));
    config.sources.reddit.base_url = base;
    config.sources.reddit.sorts = vec!["hot".into(), "new".into()];
    let global = local_global(config);

    let err = reddit::scrape(&global, today()).await.unwrap_err();

    match err {
        Error::Fetch(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[traced_test]
async fn twitter_skips_a_failing_account() {
    let api = serve(vec![
        route("/users/by/username/broken", 500, "upstream error"),
        route("/users/by/username/good", 200, r#"{"data": {"id": "42"}}"#),
        route("/users/42/tweets", 200, TIMELINE),
    ])
    .await;

    let token_env = "SHIFT_CODES_TEST_TOKEN_FOR_LOCAL_API";
    std::env::set_var(token_env, "local-token");

    let mut config = settings_for(temp_store(STORE));
    config.sources.twitter.api_base = api;
    config.sources.twitter.bearer_token_env = token_env.into();
    config.sources.twitter.account_delay_ms = 0;
    config.sources.twitter.accounts = ["broken", "good"]
        .into_iter()
        .map(|name| TwitterAccount {
            username: name.into(),
            display_name: name.into(),
        })
        .collect();
    let global = local_global(config);

    let codes = twitter::scrape(&global, today()).await.unwrap();

    let order: Vec<&str> = codes.iter().map(|c| c.code()).collect();
    assert_eq!(order, vec![C3, C4]);
    assert_eq!(find(&codes, C3).source, "Twitter good");
    assert!(logs_contain("account skipped"));
}

#[tokio::test]
async fn fetch_maps_refused_connections_to_transport() {
    let url = refused_url().await;
    let global = local_global(Settings::default());

    let err = fetch::text(global.http_client.get(&url), &url).await.unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }), "{err}");
}

#[tokio::test]
async fn fetch_maps_error_statuses() {
    let base = serve(vec![route("/gone", 503, "maintenance")]).await;
    let url = format!("{base}/gone");
    let global = local_global(Settings::default());

    let err = fetch::text(global.http_client.get(&url), &url).await.unwrap_err();

    match err {
        FetchError::Status { url: failed, status } => {
            assert_eq!(failed, url);
            assert_eq!(status.as_u16(), 503);
        }
        other => panic!("unexpected error: {other}"),
    }
}
