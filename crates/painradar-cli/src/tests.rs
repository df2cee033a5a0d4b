use std::collections::BTreeMap;

use painradar_core::{AcquisitionResult, Platform, Post, Profile, Target};
use painradar_signals::{FinderResult, FinderStats, Scorer};

use super::*;
use crate::output::{format_profile, format_results};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("expected valid cli args")
}

#[test]
fn no_command_is_none() {
    assert!(parse(&["painradar"]).command.is_none());
}

#[test]
fn trending_defaults_to_all_platforms_as_text() {
    let cli = parse(&["painradar", "trending"]);
    match cli.command {
        Some(Commands::Trending { targets, shaping }) => {
            assert_eq!(targets.platforms, vec![Target::All]);
            assert!(!shaping.dedupe && !shaping.sort_popular);
            assert_eq!(shaping.output.format, OutputFormat::Text);
            assert!(shaping.output.output.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn search_accepts_repeated_platforms_and_flags() {
    let cli = parse(&[
        "painradar", "search", "slow delivery", "--platform", "habr", "-p", "vc", "--dedupe",
        "--sort-popular", "--format", "csv", "--output", "out.csv",
    ]);
    match cli.command {
        Some(Commands::Search {
            query,
            targets,
            shaping,
        }) => {
            assert_eq!(query, "slow delivery");
            assert_eq!(
                targets.platforms,
                vec![Target::One(Platform::Habr), Target::One(Platform::Vc)]
            );
            assert!(shaping.dedupe && shaping.sort_popular);
            assert_eq!(shaping.output.format, OutputFormat::Csv);
            assert_eq!(shaping.output.output, Some(PathBuf::from("out.csv")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_platform_is_rejected() {
    assert!(Cli::try_parse_from(["painradar", "search", "q", "--platform", "myspace"]).is_err());
}

#[test]
fn problems_parses_thresholds() {
    let cli = parse(&[
        "painradar",
        "problems",
        "banks",
        "--max-variations",
        "5",
        "--min-engagement",
        "10",
        "--min-problem",
        "30",
        "--max-results",
        "20",
        "--analyze",
        "--format",
        "json",
    ]);
    assert!(matches!(
        cli.command,
        Some(Commands::Problems {
            ref topic,
            max_variations: 5,
            min_engagement: 10,
            min_problem_score: 30,
            max_results: 20,
            analyze: true,
            ..
        }) if topic == "banks"
    ));
}

#[test]
fn problems_defaults() {
    let cli = parse(&["painradar", "problems", "banks"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Problems {
            max_variations: 3,
            min_engagement: 0,
            min_problem_score: 0,
            max_results: 50,
            analyze: false,
            ..
        })
    ));
}

#[test]
fn min_engagement_above_u8_is_rejected() {
    assert!(
        Cli::try_parse_from(["painradar", "problems", "t", "--min-engagement", "300"]).is_err()
    );
}

#[test]
fn channel_defaults_to_telegram() {
    let cli = parse(&["painradar", "channel", "durov,telegram"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Channel {
            ref name,
            platform: Platform::Telegram,
            ..
        }) if name == "durov,telegram"
    ));
}

#[test]
fn profile_and_user_posts_require_platform() {
    assert!(Cli::try_parse_from(["painradar", "profile", "someone"]).is_err());
    assert!(Cli::try_parse_from(["painradar", "user-posts", "someone"]).is_err());

    let cli = parse(&["painradar", "user-posts", "someone", "--platform", "x"]);
    assert!(matches!(
        cli.command,
        Some(Commands::UserPosts {
            platform: Platform::X,
            ..
        })
    ));
}

fn post(id: &str, url: &str, likes: u64) -> Post {
    let mut post = Post::new(Platform::Pikabu, id, url);
    post.title = Some(format!("post {id}"));
    post.likes = Some(likes);
    post
}

fn results() -> BTreeMap<Platform, AcquisitionResult> {
    let mut result = AcquisitionResult::new(Platform::Pikabu);
    result.posts = vec![
        post("1", "https://pikabu.ru/story/1", 1),
        post("1b", "https://pikabu.ru/story/1?from=feed", 1),
        post("2", "https://pikabu.ru/story/2", 90),
    ];
    result.refresh();
    BTreeMap::from([(Platform::Pikabu, result)])
}

fn shaping(dedupe: bool, sort_popular: bool) -> ShapingArgs {
    ShapingArgs {
        dedupe,
        sort_popular,
        output: OutputArgs {
            format: OutputFormat::Text,
            output: None,
        },
    }
}

#[test]
fn shaping_dedupes_then_sorts() {
    let shaped = acquire::shape(results(), &shaping(true, true));
    let ids: Vec<&str> = shaped[&Platform::Pikabu]
        .posts
        .iter()
        .map(|p| p.platform_id.as_str())
        .collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert_eq!(shaped[&Platform::Pikabu].stats.posts_found, 2);

    let untouched = acquire::shape(results(), &shaping(false, false));
    assert_eq!(untouched[&Platform::Pikabu].posts.len(), 3);
}

#[test]
fn text_results_list_posts_under_summary() {
    let text = format_results(&results());
    assert!(text.starts_with("Acquisition results:"));
    assert!(text.contains("Total: 3 posts, 0 profiles"));
    assert!(text.contains("  1. post 1"));
    assert!(text.contains("https://pikabu.ru/story/2"));
}

#[test]
fn csv_results_have_header() {
    let csv = acquire::render_results(&results(), OutputFormat::Csv).unwrap();
    assert!(csv.starts_with("platform,type,id,title,author,url,likes,comments,views,collected_at"));
}

#[test]
fn profile_text_shows_missing_counts_as_dash() {
    let mut profile = Profile::new(Platform::Habr, "alice", "https://habr.com/ru/users/alice/");
    profile.follower_count = Some(12);
    let text = format_profile(&profile);
    assert!(text.starts_with("alice @alice"));
    assert!(text.contains("followers: 12"));
    assert!(text.contains("following: -"));
}

#[test]
fn problems_json_embeds_insight_only_when_present() {
    let scored = Scorer::default().score(post("9", "https://pikabu.ru/story/9", 5));
    let result = FinderResult {
        query: "banks".to_string(),
        queries: vec!["banks".to_string()],
        platforms: vec![Platform::Pikabu],
        total_posts: 1,
        ranked: vec![scored],
        top_problems: Vec::new(),
        stats: FinderStats::default(),
    };

    let plain = problems::render(&result, None, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&plain).unwrap();
    assert_eq!(value["query"], "banks");
    assert!(value.get("insight").is_none());

    let report = painradar_insight::InsightReport::empty("banks");
    let with_insight = problems::render(&result, Some(&report), OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&with_insight).unwrap();
    assert_eq!(value["insight"]["summary"], "No data to analyze.");

    let text = problems::render(&result, Some(&report), OutputFormat::Text).unwrap();
    assert!(text.contains("PROBLEM FINDER: \"banks\""));
    assert!(text.contains("AI ANALYSIS: \"banks\""));
}
