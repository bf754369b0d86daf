//! Tests against the live OpenAlex API.
//!
//! Run with: `cargo test --features integration --test live_openalex -- --nocapture`
//! Set `OPENALEX_MAILTO` to join the polite pool and `OPENALEX_TEST_AUTHOR`
//! to the author ID to query; tests pass trivially without it.

#![cfg(feature = "integration")]

use rand::SeedableRng;
use rand::rngs::StdRng;

use coauthor_timeline::client::OpenAlexClient;
use coauthor_timeline::config::Config;
use coauthor_timeline::engine::Target;
use coauthor_timeline::harvest::Harvester;
use coauthor_timeline::models::CareerSpan;

fn test_author() -> Option<String> {
    let author = std::env::var("OPENALEX_TEST_AUTHOR").ok();
    if author.is_none() {
        eprintln!("OPENALEX_TEST_AUTHOR not set, skipping");
    }
    author
}

#[tokio::test]
async fn test_live_career_span() {
    let Some(author) = test_author() else { return };
    let config = Config::from_env().unwrap();
    let client = OpenAlexClient::new(&config).unwrap();

    let span = client.fetch_career_span(&author).await.unwrap();
    println!("career span: {span:?}");
    assert!(span.is_complete());
    assert!(span.first_year <= span.last_year);
}

#[tokio::test]
async fn test_live_harvest_one_year() {
    let Some(author) = test_author() else { return };
    let config = Config::from_env().unwrap();
    let harvester = Harvester::new(OpenAlexClient::new(&config).unwrap(), &config).unwrap();

    let target = Target::new(author.as_str(), "Test Author");
    let (publications, stats) = harvester
        .harvest(&target, CareerSpan::new(2016, 2016), &mut StdRng::seed_from_u64(1))
        .await
        .unwrap();

    println!("2016: {stats:?}");
    assert!(stats.fetched >= stats.accepted);
    assert!(publications.iter().all(|p| p.year == 2016 && p.author_id == author));
}
