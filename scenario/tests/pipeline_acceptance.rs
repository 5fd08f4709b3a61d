//! Pipeline acceptance tests
//!
//! Drive whole sessions of both games through mock collaborators:
//! - catalog load, selection, finalize, projection editing
//! - submit with fenced / prose-wrapped evaluator answers
//! - failure paths keep previously committed state
//! - save summaries and receipts
//!
//! Uses mock implementations to avoid external dependencies.

use async_trait::async_trait;
use cardquest_scenario::template::business::{BusinessAttributes, ScoreBand};
use cardquest_scenario::template::policy::{PolicyAttributes, PolicyRank, PolicyTargets};
use cardquest_scenario::{
    BusinessPlan, Card, CardCatalog, CardQuestConfig, Category, ErrorCategory, Evaluator,
    PolicyPlan, Result, SaveReceipt, SaveSummary, ScenarioError, ScenarioStore, SelectionState,
    Session, Team, YearField,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// Mock Implementations
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory catalog that can fail a configurable number of loads
struct MockCatalog<A> {
    cards: Vec<Card<A>>,
    failures_left: AtomicU32,
}

impl<A> MockCatalog<A> {
    fn new(cards: Vec<Card<A>>) -> Self {
        Self {
            cards,
            failures_left: AtomicU32::new(0),
        }
    }

    fn failing_once(cards: Vec<Card<A>>) -> Self {
        Self {
            cards,
            failures_left: AtomicU32::new(1),
        }
    }
}

#[async_trait]
impl<A: Clone + Send + Sync + 'static> CardCatalog<A> for MockCatalog<A> {
    async fn fetch(&self, category: &Category) -> Result<Vec<Card<A>>> {
        if category.key == "partner"
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(ScenarioError::catalog("catalog returned 500"));
        }
        Ok(self
            .cards
            .iter()
            .filter(|c| c.suit == category.suit)
            .cloned()
            .collect())
    }
}

/// Evaluator replaying queued answers and recording prompts
struct MockEvaluator {
    answers: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl MockEvaluator {
    fn new(answers: Vec<Result<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Evaluator for MockEvaluator {
    async fn evaluate(&self, _system_prompt: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or_else(|| Err(ScenarioError::ai_service("no answer queued")))
    }
}

/// Store that fails the first `fail_first` saves
struct MockStore {
    fail_first: AtomicU32,
    saved: Mutex<Vec<(SaveSummary, serde_json::Value)>>,
}

impl MockStore {
    fn new(fail_first: u32) -> Self {
        Self {
            fail_first: AtomicU32::new(fail_first),
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ScenarioStore for MockStore {
    async fn save(
        &self,
        summary: &SaveSummary,
        evaluation: &serde_json::Value,
    ) -> Result<SaveReceipt> {
        if self
            .fail_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ScenarioError::persistence("registry timed out"));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| ScenarioError::persistence("lock poisoned"))?;
        saved.push((summary.clone(), evaluation.clone()));
        Ok(SaveReceipt {
            location_id: format!("page-{}", saved.len()),
            location_url: format!("https://example.test/page-{}", saved.len()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

fn card<A>(id: &str, suit: cardquest_scenario::Suit, rank: &str, attributes: A) -> Card<A> {
    Card {
        id: id.to_string(),
        suit,
        rank: rank.to_string(),
        title: format!("{id} title"),
        description: format!("{id} description"),
        flavor_text: None,
        card_name: id.to_string(),
        attributes,
    }
}

fn business_cards() -> Vec<Card<BusinessAttributes>> {
    use cardquest_scenario::Suit::*;
    vec![
        card(
            "students",
            Heart,
            "A",
            BusinessAttributes {
                market_size: 300,
                monthly_sales: 100,
                ..Default::default()
            },
        ),
        card(
            "seniors",
            Heart,
            "2",
            BusinessAttributes {
                market_size: 500,
                monthly_sales: 40,
                ..Default::default()
            },
        ),
        card(
            "food-waste",
            Diamond,
            "K",
            BusinessAttributes {
                unit_price: 5_000.0,
                ..Default::default()
            },
        ),
        card(
            "farmers",
            Club,
            "7",
            BusinessAttributes {
                variable_cost: 1_000.0,
                ..Default::default()
            },
        ),
        card(
            "subscription",
            Spade,
            "Q",
            BusinessAttributes {
                feasibility_score: 8.0,
                ..Default::default()
            },
        ),
    ]
}

fn policy_cards() -> Vec<Card<PolicyAttributes>> {
    use cardquest_scenario::Suit::*;
    let attrs = |wb: f64, months: u32| PolicyAttributes {
        well_being_score: wb,
        feasibility_score: 6.0,
        affected_residents: 800,
        implementation_months: months,
        budget_million_yen: 12.0,
    };
    vec![
        card("elderly-alone", Spade, "3", attrs(7.0, 6)),
        card("no-clinic", Club, "5", attrs(5.0, 12)),
        card("hospital", Diamond, "J", attrs(8.0, 18)),
        card("clinic-bus", Heart, "A", attrs(9.0, 24)),
    ]
}

fn config() -> CardQuestConfig {
    CardQuestConfig::default()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).expect("date")
}

fn business_text() -> BTreeMap<String, String> {
    [
        ("solution_name", "  Snack Box  "),
        ("user_benefit", "Healthy snacks delivered to campus"),
        ("advantage", "Direct contracts with local farms"),
        ("plan_revision", "Pilot with two universities"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

const BUSINESS_ANSWER: &str = r#"Sure! Here is the evaluation:
```json
{
  "improvedPlan": "Snack Box delivers...",
  "executiveSummary": "Fresh snacks, zero waste.",
  "score": 82,
  "scoreBreakdown": {"marketPotential": 22, "feasibility": "20", "differentiation": 20, "planQuality": 20},
  "strengths": ["clear persona", "local sourcing"],
  "issues": ["cold chain cost"],
  "nextActions": ["interview 10 students"],
  "mentorComment": "Strong start.",
  "metrics": {"monthlyRevenue": 1, "profitMargin": 3}
}
```
Good luck!"#;

async fn business_session() -> Session<BusinessPlan> {
    let catalog = MockCatalog::new(business_cards());
    Session::<BusinessPlan>::start(
        Team::new("Falcons", "Ann\nBo").expect("team"),
        None,
        &catalog,
        config(),
    )
    .await
    .expect("start")
}

fn pick_all(session: &mut Session<BusinessPlan>) {
    for (key, id) in [
        ("persona", "students"),
        ("problem", "food-waste"),
        ("partner", "farmers"),
        ("job_type", "subscription"),
    ] {
        session
            .select_card(key, id)
            .expect("select");
        session.advance().expect("advance");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Business game
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_business_golden_path() {
    let mut session = business_session().await;
    assert_eq!(session.catalog().cards(0).len(), 2);

    pick_all(&mut session);
    assert_eq!(session.state(), SelectionState::Complete);
    session.finalize().expect("finalize");

    let table = session.projection();
    let sales: Vec<u64> = table.iter().map(|y| y.monthly_sales).collect();
    assert_eq!(sales, vec![100, 120, 144, 173, 207]);

    session
        .edit_year(3, YearField::MonthlySales, 150.0)
        .expect("edit");

    let evaluator = MockEvaluator::new(vec![Ok(BUSINESS_ANSWER.to_string())]);
    let result = session
        .submit(&business_text(), &evaluator, date())
        .await
        .expect("submit")
        .clone();

    assert_eq!(evaluator.calls(), 1);
    assert_eq!(result.assessment.score, 82);
    assert_eq!(result.assessment.score_breakdown.feasibility, 20);
    assert_eq!(result.assessment.band(), ScoreBand::InvestorReady);
    assert!(result.assessment.target_customer.is_empty());

    // local numbers win over the echoed ones
    assert_eq!(result.metrics.monthly_revenue, 500_000.0);
    assert_eq!(result.metrics.variable_cost, 100_000.0);
    assert_eq!(result.metrics.monthly_profit, 400_000.0);
    assert_eq!(result.metrics.profit_margin, 80);
    assert_eq!(result.metrics.years[2].monthly_sales, 150);
    assert_eq!(result.metrics.years[3].monthly_sales, 173);

    let prompt = &evaluator.prompts()[0];
    assert!(prompt.contains("Snack Box"));
    assert!(prompt.contains("| 3 | 150 |"));
    assert!(prompt.contains("Date: 2025-04-01"));

    let summary = session.save_summary().expect("summary");
    assert_eq!(summary.title, "Falcons - Snack Box (2025/04/01)");
    assert_eq!(summary.headline_score, "82");
    let labels: Vec<&str> = summary.cards.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "A - students title",
            "K - food-waste title",
            "7 - farmers title",
            "Q - subscription title"
        ]
    );

    let store = MockStore::new(0);
    let receipt = session.save(&store).await.expect("save").clone();
    assert_eq!(receipt.location_id, "page-1");
    assert_eq!(session.receipt(), Some(&receipt));

    let saved = store.saved.lock().map(|s| s.clone()).unwrap_or_default();
    assert_eq!(saved[0].1["metrics"]["monthlyRevenue"], serde_json::json!(500_000.0));
}

#[tokio::test]
async fn test_incomplete_selection_blocks_advance_and_submit() {
    let mut session = business_session().await;
    let err = session.advance().expect_err("nothing selected");
    assert_eq!(err.category(), ErrorCategory::IncompleteSelection);

    session.select_card("persona", "seniors").expect("select");
    session.jump_to(3).expect("jump");
    session.select_card("job_type", "subscription").expect("select");

    let evaluator = MockEvaluator::new(Vec::new());
    match session.submit(&business_text(), &evaluator, date()).await {
        Err(ScenarioError::IncompleteSelection { missing }) => {
            assert_eq!(missing, vec!["problem".to_string(), "partner".to_string()]);
        }
        other => panic!("expected IncompleteSelection, got {other:?}"),
    }
    assert_eq!(evaluator.calls(), 0);
}

#[tokio::test]
async fn test_blank_text_rejected_before_evaluator_call() {
    let mut session = business_session().await;
    pick_all(&mut session);

    let mut text = business_text();
    text.insert("advantage".to_string(), " \n\t ".to_string());
    let evaluator = MockEvaluator::new(vec![Ok(BUSINESS_ANSWER.to_string())]);

    let err = session
        .submit(&text, &evaluator, date())
        .await
        .expect_err("blank advantage");
    assert_eq!(err.category(), ErrorCategory::ValidationError);
    assert_eq!(evaluator.calls(), 0);
}

#[tokio::test]
async fn test_failed_submits_keep_previous_evaluation() {
    let mut session = business_session().await;
    pick_all(&mut session);

    let evaluator = MockEvaluator::new(vec![
        Ok(BUSINESS_ANSWER.to_string()),
        Err(ScenarioError::ai_service("HTTP 503")),
        Ok("I cannot answer that.".to_string()),
    ]);

    session
        .submit(&business_text(), &evaluator, date())
        .await
        .expect("first submit");

    let err = session
        .submit(&business_text(), &evaluator, date())
        .await
        .expect_err("service down");
    assert_eq!(err.category(), ErrorCategory::AiServiceError);
    assert!(err.is_retryable());
    assert_eq!(session.evaluation().map(|e| e.assessment.score), Some(82));

    let err = session
        .submit(&business_text(), &evaluator, date())
        .await
        .expect_err("malformed");
    match &err {
        ScenarioError::MalformedAiResponse {
            raw_length,
            preview,
            ..
        } => {
            assert_eq!(*raw_length, "I cannot answer that.".len());
            assert_eq!(preview, "I cannot answer that.");
        }
        other => panic!("expected MalformedAiResponse, got {other:?}"),
    }
    assert_eq!(session.evaluation().map(|e| e.assessment.score), Some(82));

    // identical submissions render identical prompts
    let prompts = evaluator.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], prompts[1]);
    assert_eq!(prompts[1], prompts[2]);
}

#[tokio::test]
async fn test_failed_save_keeps_evaluation_and_can_retry() {
    let mut session = business_session().await;
    pick_all(&mut session);
    let evaluator = MockEvaluator::new(vec![Ok(BUSINESS_ANSWER.to_string())]);
    session
        .submit(&business_text(), &evaluator, date())
        .await
        .expect("submit");

    let store = MockStore::new(1);
    let err = session.save(&store).await.expect_err("first save fails");
    assert_eq!(err.category(), ErrorCategory::PersistenceError);
    assert!(session.evaluation().is_some());
    assert!(session.receipt().is_none());

    let receipt = session.save(&store).await.expect("retry").clone();
    assert_eq!(receipt.location_url, "https://example.test/page-1");
}

#[tokio::test]
async fn test_catalog_failure_then_manual_retry() {
    let catalog = MockCatalog::failing_once(business_cards());
    let team = Team::new("Falcons", "Ann").expect("team");

    let err = Session::<BusinessPlan>::start(team.clone(), None, &catalog, config())
        .await
        .expect_err("first load fails");
    assert_eq!(err.category(), ErrorCategory::CatalogError);
    assert!(err.is_retryable());

    let session = Session::<BusinessPlan>::start(team, None, &catalog, config())
        .await
        .expect("retry succeeds");
    assert_eq!(session.catalog().cards(2).len(), 1);
}

#[tokio::test]
async fn test_empty_category_is_accepted() {
    let cards: Vec<Card<BusinessAttributes>> = business_cards()
        .into_iter()
        .filter(|c| c.suit != cardquest_scenario::Suit::Spade)
        .collect();
    let catalog = MockCatalog::new(cards);
    let session = Session::<BusinessPlan>::start(
        Team::new("Falcons", "Ann").expect("team"),
        None,
        &catalog,
        config(),
    )
    .await
    .expect("start");
    assert!(session.catalog().cards(3).is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy game
// ─────────────────────────────────────────────────────────────────────────────

const POLICY_ANSWER: &str = r#"{
  "proposal": "A clinic bus staffed with hospital volunteers...",
  "wellBeingScores": {"economic": 8, "socialConnection": 10.5, "healthMedical": 12.5,
    "autonomy": 9, "generosity": 10, "trust": 9.5, "safety": 11, "nature": 7, "total": 100},
  "populationSim": {"withoutPolicy": {"y5": 9200, "y10": 8500, "y20": 7100},
                    "withPolicy": {"y5": 9900, "y10": "10400", "y20": 12100}},
  "rankJudge": {"populationAchieved": true, "wellBeingAchieved": "true",
                "populationDiff": 100, "wellBeingDiff": 2.5},
  "rank": "a",
  "strengths": ["health access"],
  "challenges": ["driver shortage"],
  "nextActions": ["pilot route"],
  "comment": "Promising."
}"#;

#[tokio::test]
async fn test_policy_golden_path() {
    let catalog = MockCatalog::new(policy_cards());
    let mut session = Session::<PolicyPlan>::start(
        Team::new("Harbor", "Kai\nMio").expect("team"),
        Some(PolicyTargets {
            target_population: 12_000,
            target_well_being: 75,
        }),
        &catalog,
        config(),
    )
    .await
    .expect("start");

    assert_eq!(
        session.current_category().map(|c| c.suit),
        Some(cardquest_scenario::Suit::Spade)
    );
    for (key, id) in [
        ("persona", "elderly-alone"),
        ("problem", "no-clinic"),
        ("partner", "hospital"),
        ("action", "clinic-bus"),
    ] {
        session.select_card(key, id).expect("select");
    }
    session.finalize().expect("finalize");

    let metrics = session.metrics().expect("metrics");
    assert_eq!(metrics.mean_well_being, 7.25);
    assert_eq!(metrics.total_affected_residents, 3_200);
    assert_eq!(metrics.longest_implementation_months, 24);
    assert_eq!(metrics.total_budget_million_yen, 48.0);
    assert_eq!(metrics.baseline_population, 10_000);

    let mut text = BTreeMap::new();
    text.insert("plan_text".to_string(), "Run a weekly clinic bus".to_string());
    let evaluator = MockEvaluator::new(vec![Ok(POLICY_ANSWER.to_string())]);
    let result = session
        .submit(&text, &evaluator, date())
        .await
        .expect("submit")
        .clone();

    assert_eq!(result.assessment.well_being_scores.total, 77.5);
    assert_eq!(result.assessment.rank(), Some(PolicyRank::A));
    assert_eq!(result.assessment.population_sim.with_policy.y10, 10_400);
    assert!(result.assessment.rank_judge.well_being_achieved);
    assert_eq!(result.metrics, metrics);

    let prompt = &evaluator.prompts()[0];
    assert!(prompt.contains("Target population: 12,000 (starting from 10,000)"));
    assert!(prompt.contains("Run a weekly clinic bus"));

    let summary = session.save_summary().expect("summary");
    assert_eq!(summary.title, "Harbor - Run a weekly clinic bus (2025/04/01)");
    assert_eq!(summary.headline_score, "A");
}

#[tokio::test]
async fn test_policy_targets_out_of_range() {
    let catalog = MockCatalog::new(policy_cards());
    for targets in [
        PolicyTargets {
            target_population: 10_000,
            target_well_being: 75,
        },
        PolicyTargets {
            target_population: 20_001,
            target_well_being: 75,
        },
        PolicyTargets {
            target_population: 12_000,
            target_well_being: 39,
        },
    ] {
        let err = Session::<PolicyPlan>::start(
            Team::new("Harbor", "Kai").expect("team"),
            Some(targets),
            &catalog,
            config(),
        )
        .await
        .expect_err("out of range");
        assert_eq!(err.category(), ErrorCategory::ValidationError);
    }
}
