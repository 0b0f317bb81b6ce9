use super::*;
use crate::config::PeerConfig;
use crate::protocol::{
    self, BudgetTier, MessageResponse, ResultItem, TaskStatus, CHAT_PATH, DISCOVERY_PATH,
    MESSAGE_PATH,
};
use crate::registry::AgentCard;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FakePeer {
    card: AgentCard,
    items: usize,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakePeer {
    fn result(&self) -> CapabilityResult {
        CapabilityResult::completed(
            (0..self.items)
                .map(|i| ResultItem {
                    name: format!("{} #{}", self.card.name, i + 1),
                    description: format!("from ${}", 50 + i),
                    link: format!("https://example.com/{}", i),
                    estimated_cost: format!("${} USD", 50 + i),
                })
                .collect(),
        )
    }
}

async fn card(State(peer): State<Arc<FakePeer>>) -> Json<AgentCard> {
    Json(peer.card.clone())
}

async fn message(State(peer): State<Arc<FakePeer>>, body: Bytes) -> Json<MessageResponse> {
    peer.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(peer.delay).await;
    let envelope = protocol::decode(&body).unwrap();
    Json(MessageResponse::success(
        envelope.message_id,
        serde_json::to_value(peer.result()).unwrap(),
        json!({"agent": peer.card.name}),
    ))
}

async fn chat(State(peer): State<Arc<FakePeer>>) -> Json<Value> {
    peer.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(peer.delay).await;
    Json(json!({"response": peer.result().structured_items}))
}

async fn spawn_peer(
    capability: TravelCapability,
    items: usize,
    delay: Duration,
) -> (String, Arc<FakePeer>) {
    spawn_with_card(|url| AgentCard::for_capability(capability, url), items, delay).await
}

async fn spawn_with_card(
    card: impl FnOnce(String) -> AgentCard,
    items: usize,
    delay: Duration,
) -> (String, Arc<FakePeer>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let peer = Arc::new(FakePeer {
        card: card(url.clone()),
        items,
        delay,
        calls: AtomicUsize::new(0),
    });
    let app = Router::new()
        .route(DISCOVERY_PATH, get(self::card))
        .route(MESSAGE_PATH, post(message))
        .route(CHAT_PATH, post(chat))
        .with_state(peer.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (url, peer)
}

struct StubLlm {
    answer: Option<&'static str>,
    delay: Duration,
}

#[async_trait]
impl Completion for StubLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.answer
            .map(str::to_string)
            .ok_or_else(|| Error::Llm("rate limited".into()))
    }
}

fn llm() -> Arc<dyn Completion> {
    Arc::new(StubLlm {
        answer: Some("Day 1: arrive in Paris."),
        delay: Duration::ZERO,
    })
}

fn paris() -> TripRequest {
    TripRequest {
        destination: "Paris".into(),
        check_in: NaiveDate::from_ymd_opt(2025, 11, 11).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
        budget_tier: BudgetTier::Budget,
        guest_count: 2,
        car_needed: true,
        preferences: None,
    }
}

fn config(peers: Vec<PeerConfig>) -> PlannerConfig {
    PlannerConfig {
        discovery_timeout: Duration::from_secs(2),
        call_timeout: Duration::from_secs(5),
        narrative_timeout: Duration::from_secs(2),
        overall_deadline: Duration::from_secs(10),
        ..PlannerConfig::default()
    }
    .with_peers(peers)
    .with_strategy(StrategyChoice::Protocol)
}

#[tokio::test]
async fn test_both_peers_healthy() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 3, Duration::ZERO).await;
    let (car_url, _) = spawn_peer(TravelCapability::CarRental, 2, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", car_url),
        ]),
        llm(),
    )
    .await
    .unwrap();

    assert_eq!(coordinator.strategy(), PlannerStrategy::ProtocolCoordinated);
    assert!(coordinator.excluded().is_empty());

    let plan = coordinator.plan(paris()).await.unwrap();

    let hotels = plan.hotel_results.unwrap();
    let cars = plan.car_results.unwrap();
    assert_eq!(hotels.status, TaskStatus::Completed);
    assert_eq!(hotels.structured_items.len(), 3);
    assert_eq!(cars.structured_items.len(), 2);
    assert_eq!(plan.narrative, "Day 1: arrive in Paris.");
    assert!(plan.per_agent_status["hotel"].reachable);
    assert!(plan.per_agent_status["car"].reachable);
    assert_eq!(plan.destination, "Paris");
}

#[tokio::test]
async fn test_single_peer_outage() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 3, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", "http://127.0.0.1:9"),
        ]),
        llm(),
    )
    .await
    .unwrap();

    assert_eq!(coordinator.excluded().len(), 1);

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 3);
    assert!(plan.car_results.is_none());
    assert!(!plan.per_agent_status["car"].reachable);
    assert!(plan.per_agent_status["car"].error.is_some());
    assert!(!plan.narrative.is_empty());
}

#[tokio::test]
async fn test_discovery_error_means_no_sends() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let mut broken = mockito::Server::new_async().await;
    broken
        .mock("GET", DISCOVERY_PATH)
        .with_status(500)
        .create_async()
        .await;
    let message = broken
        .mock("POST", MESSAGE_PATH)
        .expect(0)
        .create_async()
        .await;
    let chat = broken.mock("POST", CHAT_PATH).expect(0).create_async().await;

    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", broken.url()),
        ]),
        llm(),
    )
    .await
    .unwrap();
    let plan = coordinator.plan(paris()).await.unwrap();

    message.assert_async().await;
    chat.assert_async().await;
    assert!(!plan.per_agent_status["car"].reachable);
    assert!(plan.hotel_results.is_some());
}

#[tokio::test]
async fn test_slow_peer_times_out_without_blocking_sibling() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 2, Duration::from_millis(100)).await;
    let (car_url, _) = spawn_peer(TravelCapability::CarRental, 2, Duration::from_secs(5)).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", car_url),
        ])
        .with_call_timeout(Duration::from_millis(400)),
        llm(),
    )
    .await
    .unwrap();

    let started = Instant::now();
    let plan = coordinator.plan(paris()).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(400));
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    let car = &plan.per_agent_status["car"];
    assert!(!car.reachable);
    assert_eq!(car.error.as_deref(), Some("timeout"));
    assert!(plan.car_results.is_none());
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 2);
}

#[tokio::test]
async fn test_narrative_failure_uses_placeholder() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let failing = Arc::new(StubLlm {
        answer: None,
        delay: Duration::ZERO,
    });
    let coordinator =
        Coordinator::connect(config(vec![PeerConfig::new("hotel", hotel_url)]), failing)
            .await
            .unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.narrative, NARRATIVE_PLACEHOLDER);
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 1);
}

#[tokio::test]
async fn test_slow_narrative_times_out() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let slow = Arc::new(StubLlm {
        answer: Some("too late"),
        delay: Duration::from_secs(5),
    });
    let mut cfg = config(vec![PeerConfig::new("hotel", hotel_url)]);
    cfg.narrative_timeout = Duration::from_millis(200);
    let coordinator = Coordinator::connect(cfg, slow).await.unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.narrative, NARRATIVE_PLACEHOLDER);
}

#[tokio::test]
async fn test_deadline_with_nothing_settled_fails() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::from_secs(3)).await;
    let coordinator = Coordinator::connect(
        config(vec![PeerConfig::new("hotel", hotel_url)])
            .with_overall_deadline(Duration::from_millis(300)),
        llm(),
    )
    .await
    .unwrap();

    let err = coordinator.plan(paris()).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded(_)));
}

#[tokio::test]
async fn test_deadline_keeps_settled_results() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 2, Duration::ZERO).await;
    let (car_url, _) = spawn_peer(TravelCapability::CarRental, 2, Duration::from_secs(3)).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", car_url),
        ])
        .with_overall_deadline(Duration::from_millis(500)),
        llm(),
    )
    .await
    .unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 2);
    assert_eq!(plan.per_agent_status["car"].error.as_deref(), Some("timeout"));
    assert_eq!(plan.narrative, NARRATIVE_PLACEHOLDER);
}

#[tokio::test]
async fn test_car_not_needed_skips_car_peer() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let (car_url, car) = spawn_peer(TravelCapability::CarRental, 2, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", car_url),
        ]),
        llm(),
    )
    .await
    .unwrap();

    let mut request = paris();
    request.car_needed = false;
    let plan = coordinator.plan(request).await.unwrap();

    assert_eq!(car.calls.load(Ordering::SeqCst), 0);
    assert!(plan.car_results.is_none());
    assert!(plan.per_agent_status["car"].reachable);
}

#[tokio::test]
async fn test_overlapping_capabilities_concatenate() {
    let (first, _) = spawn_peer(TravelCapability::Hotel, 2, Duration::ZERO).await;
    let (second, _) = spawn_peer(TravelCapability::Hotel, 3, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotels-a", first),
            PeerConfig::new("hotels-b", second),
        ]),
        llm(),
    )
    .await
    .unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 5);
}

#[tokio::test]
async fn test_direct_strategy_uses_chat() {
    let (hotel_url, hotel) = spawn_peer(TravelCapability::Hotel, 2, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url).with_capability("hotel_search")
        ])
        .with_strategy(StrategyChoice::Direct),
        llm(),
    )
    .await
    .unwrap();

    assert_eq!(coordinator.strategy(), PlannerStrategy::DirectHttpFallback);
    assert_eq!(coordinator.connections()[0].transport(), Transport::SimpleChat);

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(plan.hotel_results.unwrap().structured_items.len(), 2);
    assert_eq!(hotel.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_direct_peer_routed_by_name() {
    let (hotel_url, hotel) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![PeerConfig::new("hotel", hotel_url)]).with_strategy(StrategyChoice::Direct),
        llm(),
    )
    .await
    .unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(hotel.calls.load(Ordering::SeqCst), 1);
    assert!(plan.hotel_results.is_some());
    assert!(plan.per_agent_status["hotel"].reachable);
}

#[tokio::test]
async fn test_unroutable_peer_reported_unreachable() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let (concierge_url, concierge) = spawn_with_card(
        |url| {
            let mut card = AgentCard::hotel(url);
            card.name = "Concierge".into();
            card.capabilities = [("streaming".to_string(), "true".to_string())].into();
            card.skills.clear();
            card
        },
        1,
        Duration::ZERO,
    )
    .await;
    let mut cfg = config(vec![
        PeerConfig::new("hotel", hotel_url),
        PeerConfig::new("concierge", concierge_url),
    ]);
    cfg.chat_fallback = false;
    let coordinator = Coordinator::connect(cfg, llm()).await.unwrap();

    let plan = coordinator.plan(paris()).await.unwrap();
    assert_eq!(concierge.calls.load(Ordering::SeqCst), 0);
    let status = &plan.per_agent_status["concierge"];
    assert!(!status.reachable);
    assert_eq!(status.error.as_deref(), Some("no routable capability"));
    assert!(plan.per_agent_status["hotel"].reachable);
}

#[tokio::test]
async fn test_missing_card_falls_back_to_chat() {
    let mut legacy = mockito::Server::new_async().await;
    legacy
        .mock("GET", DISCOVERY_PATH)
        .with_status(404)
        .create_async()
        .await;
    let chat = legacy
        .mock("POST", CHAT_PATH)
        .with_status(200)
        .with_body(json!({"response": "[{\"title\": \"Legacy Hotel\"}]"}).to_string())
        .expect(1)
        .create_async()
        .await;

    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("legacy", legacy.url()).with_capability("hotel_search")
        ])
        .with_strategy(StrategyChoice::Auto),
        llm(),
    )
    .await
    .unwrap();

    assert_eq!(coordinator.strategy(), PlannerStrategy::DirectHttpFallback);
    let plan = coordinator.plan(paris()).await.unwrap();

    chat.assert_async().await;
    assert_eq!(plan.hotel_results.unwrap().structured_items[0].name, "Legacy Hotel");
}

#[tokio::test]
async fn test_invalid_request_rejected() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let coordinator = Coordinator::connect(config(vec![PeerConfig::new("hotel", hotel_url)]), llm())
        .await
        .unwrap();

    let mut request = paris();
    request.destination = "  ".into();
    assert!(matches!(
        coordinator.plan(request).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
async fn test_status_report() {
    let (hotel_url, _) = spawn_peer(TravelCapability::Hotel, 1, Duration::ZERO).await;
    let coordinator = Coordinator::connect(
        config(vec![
            PeerConfig::new("hotel", hotel_url),
            PeerConfig::new("car", "http://127.0.0.1:9"),
        ]),
        llm(),
    )
    .await
    .unwrap();
    coordinator.plan(paris()).await.unwrap();

    let status = coordinator.status().await;
    assert_eq!(status.peers.len(), 2);
    let hotel = status.peers.iter().find(|p| p.name == "hotel").unwrap();
    assert_eq!(hotel.metrics.as_ref().unwrap().calls, 1);
    assert_eq!(hotel.transport, Some(Transport::Envelope));
    let car = status.peers.iter().find(|p| p.name == "car").unwrap();
    assert!(car.excluded.is_some());
}
