use std::time::Duration;

use canvas::doc::{ShapeKind, ShapeSpec};
use canvas::engine::EngineCore;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::annotation::AnnotationKind;
use crate::client::SolutionStep;
use crate::mocks::{ScriptedClient, page_with_work, shared, warning_at};

struct Harness {
    manager: Arc<LifecycleManager<EngineCore>>,
    surface: Arc<Mutex<EngineCore>>,
    client: Arc<ScriptedClient>,
}

fn harness_with(core: EngineCore, client: ScriptedClient, config: AnnotatorConfig) -> Harness {
    let surface = Arc::new(Mutex::new(core));
    let client = shared(client);
    let clock = Arc::new(ActivityClock::new(config.idle_threshold));
    let manager = Arc::new(LifecycleManager::with_renderer(
        Arc::clone(&surface),
        client.clone(),
        client.clone(),
        clock,
        config,
        AnnotationRenderer::with_rng(0.0, StdRng::seed_from_u64(1)),
    ));
    Harness { manager, surface, client }
}

fn harness(client: ScriptedClient) -> Harness {
    harness_with(page_with_work(), client, AnnotatorConfig::default())
}

async fn annotation_count(h: &Harness) -> usize {
    tag::annotation_shape_ids(&*h.surface.lock().await).len()
}

fn completed(outcome: PassOutcome) -> PassReport {
    match outcome {
        PassOutcome::Completed(report) => report,
        other => panic!("expected a completed pass, got {other:?}"),
    }
}

// =============================================================
// Supersession
// =============================================================

#[tokio::test]
async fn pass_renders_returned_annotations() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![warning_at(0.1, 0.1), warning_at(0.5, 0.5), warning_at(0.8, 0.1)]));
    let h = harness(client);

    let report = completed(h.manager.trigger(Trigger::Manual).await);
    assert_eq!(report.received, 3);
    assert_eq!(report.render.placed, 3);
    assert_eq!(annotation_count(&h).await, 9);
}

#[tokio::test]
async fn empty_result_wipes_previous_annotations() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![warning_at(0.1, 0.1), warning_at(0.5, 0.5), warning_at(0.8, 0.1)]));
    client.push_analysis(Ok(Vec::new()));
    let h = harness(client);

    completed(h.manager.trigger(Trigger::Manual).await);
    let report = completed(h.manager.trigger(Trigger::Manual).await);

    assert_eq!(report.cleared, 9);
    assert_eq!(annotation_count(&h).await, 0);
    // The student's rectangle survives.
    assert_eq!(h.surface.lock().await.list_shape_ids().len(), 1);
}

#[tokio::test]
async fn repeated_finding_is_redrawn_not_suppressed() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![warning_at(0.3, 0.3)]));
    client.push_analysis(Ok(vec![warning_at(0.3, 0.3)]));
    let h = harness(client);

    completed(h.manager.trigger(Trigger::Manual).await);
    let report = completed(h.manager.trigger(Trigger::Manual).await);

    assert_eq!((report.render.placed, report.render.suppressed), (1, 0));
    assert_eq!(annotation_count(&h).await, 3);
}

#[tokio::test]
async fn analysis_leaves_solution_in_place() {
    let client = ScriptedClient::new();
    client.push_solution(Ok(vec![SolutionStep { explanation: "Suma 2 y 3.".into(), latex: "2+3=5".into() }]));
    client.push_analysis(Ok(vec![warning_at(0.1, 0.1)]));
    client.push_analysis(Ok(Vec::new()));
    let h = harness(client);

    let solution = h.manager.generate_solution().await.unwrap();
    completed(h.manager.trigger(Trigger::Manual).await);
    completed(h.manager.trigger(Trigger::Manual).await);

    let surface = h.surface.lock().await;
    assert_eq!(tag::solution_shape_ids(&*surface).len(), solution.shape_count);
    assert!(tag::annotation_shape_ids(&*surface).is_empty());
}

// =============================================================
// Failures
// =============================================================

#[tokio::test]
async fn empty_canvas_skips_without_notice() {
    let h = harness_with(EngineCore::new(), ScriptedClient::new(), AnnotatorConfig::default());
    let mut notices = h.manager.subscribe_notices();

    let outcome = h.manager.trigger(Trigger::Manual).await;

    assert!(matches!(outcome, PassOutcome::Aborted(PassError::NoContent)));
    assert_eq!(h.client.calls(), 0);
    assert!(notices.try_recv().is_err());
    assert_eq!(h.manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn transport_failure_keeps_canvas_and_notifies() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![warning_at(0.2, 0.2)]));
    client.push_analysis(Err(ClientError::Status { status: 500, body: "boom".into() }));
    let h = harness(client);
    let mut notices = h.manager.subscribe_notices();

    completed(h.manager.trigger(Trigger::Manual).await);
    let outcome = h.manager.trigger(Trigger::Manual).await;

    assert!(matches!(outcome, PassOutcome::Aborted(PassError::TransportFailure(_))));
    assert_eq!(annotation_count(&h).await, 3);
    assert!(matches!(notices.try_recv(), Ok(Notice::TransportFailure { .. })));
    assert_eq!(h.manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn oversized_content_is_a_capture_failure() {
    let mut core = EngineCore::new();
    core.draw(ShapeSpec::new(ShapeKind::Rect, 0.0, 0.0, 50_000.0, 10.0));
    let h = harness_with(core, ScriptedClient::new(), AnnotatorConfig::default());
    let mut notices = h.manager.subscribe_notices();

    let outcome = h.manager.trigger(Trigger::Manual).await;

    assert!(matches!(outcome, PassOutcome::Aborted(PassError::CaptureFailure(_))));
    assert!(matches!(notices.try_recv(), Ok(Notice::CaptureFailure { .. })));
    assert_eq!(h.client.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_backend_times_out() {
    let config = AnnotatorConfig { analyze_timeout: Duration::from_secs(5), ..AnnotatorConfig::default() };
    let h = harness_with(page_with_work(), ScriptedClient::gated(), config);
    let mut notices = h.manager.subscribe_notices();

    let outcome = h.manager.trigger(Trigger::Manual).await;

    assert!(matches!(outcome, PassOutcome::Aborted(PassError::TransportFailure(ClientError::Timeout(_)))));
    assert!(matches!(notices.try_recv(), Ok(Notice::TransportFailure { .. })));
    assert!(!h.manager.is_analyzing());
}

// =============================================================
// Exclusivity and coalescing
// =============================================================

#[tokio::test]
async fn triggers_during_a_pass_do_not_start_another() {
    let h = harness(ScriptedClient::gated());
    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move { manager.trigger(Trigger::Manual).await });

    h.client.entered.notified().await;
    assert_eq!(h.manager.phase(), Phase::Awaiting);
    assert!(matches!(h.manager.trigger(Trigger::Timer).await, PassOutcome::Ignored));

    // A rejected trigger leaves the running pass in charge.
    assert_eq!(h.manager.phase(), Phase::Awaiting);
    assert!(h.manager.is_analyzing());
    assert!(matches!(h.manager.trigger(Trigger::Timer).await, PassOutcome::Ignored));
    assert!(matches!(h.manager.trigger(Trigger::Manual).await, PassOutcome::Queued));
    assert_eq!(h.manager.phase(), Phase::Awaiting);
    assert_eq!(h.client.calls(), 1);

    h.client.release(2);
    completed(first.await.unwrap());
    // Exactly the one queued follow-up.
    assert_eq!(h.client.calls(), 2);
    assert_eq!(h.manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn rejected_solution_request_keeps_the_pass_exclusive() {
    let h = harness(ScriptedClient::gated());
    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move { manager.trigger(Trigger::Manual).await });

    h.client.entered.notified().await;
    assert!(matches!(h.manager.generate_solution().await, Err(PassError::Busy)));
    assert!(h.manager.is_analyzing());
    assert!(matches!(h.manager.clear_annotations().await, Err(PassError::Busy)));
    assert!(matches!(h.manager.trigger(Trigger::Timer).await, PassOutcome::Ignored));
    assert_eq!(h.client.calls(), 1);
    assert!(h.client.solution_requests.lock().unwrap().is_empty());

    h.client.release(1);
    completed(first.await.unwrap());
    assert_eq!(h.client.calls(), 1);
}

#[tokio::test]
async fn request_stored_after_owner_released_still_runs() {
    let h = harness(ScriptedClient::new());
    // The owner finished and released before the queued request landed.
    h.manager.pending.store(true, Ordering::SeqCst);
    h.manager.drain_pending().await;

    assert_eq!(h.client.calls(), 1);
    assert!(!h.manager.pending.load(Ordering::SeqCst));
    assert_eq!(h.manager.phase(), Phase::Idle);
}

#[tokio::test]
async fn manual_triggers_coalesce_into_one_follow_up() {
    let h = harness(ScriptedClient::gated());
    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move { manager.trigger(Trigger::Manual).await });

    h.client.entered.notified().await;
    assert!(matches!(h.manager.trigger(Trigger::Manual).await, PassOutcome::Queued));
    assert!(matches!(h.manager.trigger(Trigger::Manual).await, PassOutcome::Queued));

    h.client.release(2);
    completed(first.await.unwrap());
    assert_eq!(h.client.calls(), 2);
}

#[tokio::test]
async fn other_operations_are_busy_during_a_pass() {
    let h = harness(ScriptedClient::gated());
    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move { manager.trigger(Trigger::Manual).await });

    h.client.entered.notified().await;
    assert!(matches!(h.manager.generate_solution().await, Err(PassError::Busy)));
    assert!(matches!(h.manager.clear_annotations().await, Err(PassError::Busy)));
    assert!(matches!(h.manager.clear_solution().await, Err(PassError::Busy)));

    h.client.release(1);
    completed(first.await.unwrap());
}

#[tokio::test]
async fn phase_walks_through_a_pass() {
    let h = harness(ScriptedClient::gated());
    let mut phases = h.manager.subscribe_phase();
    let manager = Arc::clone(&h.manager);
    let first = tokio::spawn(async move { manager.trigger(Trigger::Manual).await });

    h.client.entered.notified().await;
    assert_eq!(*phases.borrow_and_update(), Phase::Awaiting);
    assert!(h.manager.is_analyzing());

    h.client.release(1);
    completed(first.await.unwrap());
    assert_eq!(*phases.borrow_and_update(), Phase::Idle);
}

// =============================================================
// Mode, timer, configuration
// =============================================================

#[tokio::test]
async fn request_carries_mode_and_statement() {
    let h = harness(ScriptedClient::new());
    h.manager.set_exercise_statement("Resuelve 2x + 3 = 7");

    completed(h.manager.trigger(Trigger::Manual).await);

    let requests = h.client.analyze_requests.lock().unwrap();
    assert_eq!(requests[0].mode, AnalysisMode::Active);
    assert_eq!(requests[0].exercise_statement, "Resuelve 2x + 3 = 7");
    assert!(requests[0].image_data_url.starts_with("data:image/png;base64,"));
}

#[tokio::test(start_paused = true)]
async fn idle_hint_bumps_the_clock() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![warning_at(0.4, 0.4)]));
    let h = harness(client);
    tokio::time::advance(Duration::from_secs(61)).await;

    let report = completed(h.manager.trigger(Trigger::Manual).await);

    assert_eq!(report.mode, AnalysisMode::Idle);
    assert_eq!(h.manager.clock().mode(), AnalysisMode::Active);
}

#[tokio::test(start_paused = true)]
async fn empty_idle_result_keeps_idle() {
    let h = harness(ScriptedClient::new());
    tokio::time::advance(Duration::from_secs(61)).await;

    let report = completed(h.manager.trigger(Trigger::Manual).await);

    assert_eq!(report.mode, AnalysisMode::Idle);
    assert_eq!(h.manager.clock().mode(), AnalysisMode::Idle);
}

#[tokio::test]
async fn manual_only_mode_ignores_timer() {
    let config = AnnotatorConfig { manual_trigger_only: true, ..AnnotatorConfig::default() };
    let h = harness_with(page_with_work(), ScriptedClient::new(), config);

    assert!(matches!(h.manager.trigger(Trigger::Timer).await, PassOutcome::Ignored));
    assert_eq!(h.client.calls(), 0);
    completed(h.manager.trigger(Trigger::Manual).await);
    assert_eq!(h.client.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn timer_fires_after_each_interval() {
    let config = AnnotatorConfig { analysis_interval: Duration::from_secs(10), ..AnnotatorConfig::default() };
    let h = harness_with(page_with_work(), ScriptedClient::new(), config);
    let timer = Arc::clone(&h.manager).spawn_timer();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.client.calls(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.client.calls() >= 1);

    timer.abort();
}

// =============================================================
// Solution and manual clearing
// =============================================================

#[tokio::test]
async fn solution_replaces_previous_solution() {
    let client = ScriptedClient::new();
    let step = || SolutionStep { explanation: "Resta 3.".into(), latex: "2x = 4".into() };
    client.push_solution(Ok(vec![step(), step()]));
    client.push_solution(Ok(vec![step()]));
    let h = harness(client);

    let first = h.manager.generate_solution().await.unwrap();
    let second = h.manager.generate_solution().await.unwrap();

    assert_eq!(first.steps, 2);
    assert_eq!(second.cleared, first.shape_count);
    assert_eq!(tag::solution_shape_ids(&*h.surface.lock().await).len(), second.shape_count);
}

#[tokio::test]
async fn solution_on_empty_page_sends_no_image() {
    let h = harness_with(EngineCore::new(), ScriptedClient::new(), AnnotatorConfig::default());
    h.manager.set_exercise_statement("Deriva x^2");

    let report = h.manager.generate_solution().await.unwrap();

    assert_eq!(report.steps, 0);
    let requests = h.client.solution_requests.lock().unwrap();
    assert!(requests[0].image_data_url.is_none());
    assert_eq!(requests[0].exercise_statement, "Deriva x^2");
}

#[tokio::test]
async fn solution_failure_notifies_and_leaves_canvas() {
    let client = ScriptedClient::new();
    client.push_solution(Err(ClientError::Request("refused".into())));
    let h = harness(client);
    let mut notices = h.manager.subscribe_notices();

    assert!(matches!(h.manager.generate_solution().await, Err(PassError::TransportFailure(_))));
    assert!(matches!(notices.try_recv(), Ok(Notice::TransportFailure { .. })));
    assert_eq!(h.surface.lock().await.list_shape_ids().len(), 1);
}

#[tokio::test]
async fn clear_annotations_keeps_student_work() {
    let client = ScriptedClient::new();
    client.push_analysis(Ok(vec![
        warning_at(0.2, 0.2),
        Annotation { id: None, text: "Bien".into(), explanation: "Correcto".into(), kind: AnnotationKind::Success },
    ]));
    let h = harness(client);
    completed(h.manager.trigger(Trigger::Manual).await);

    assert_eq!(h.manager.clear_annotations().await.unwrap(), 4);
    assert_eq!(h.surface.lock().await.list_shape_ids().len(), 1);
}
