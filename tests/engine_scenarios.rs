//! End-to-end round scenarios on a paused clock.

use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Duration};

use reaction_games::core::image::{ImageDescriptor, Rgb};
use reaction_games::core::node::node_range;
use reaction_games::device::{DeviceCommand, InternalUpdate, PressEvent};
use reaction_games::game::content::ContentKind;
use reaction_games::game::events::{EndReason, RoundEvent};
use reaction_games::game::placer::SpecialRule;
use reaction_games::game::press::PressOutcome;
use reaction_games::game::round::{RoundConfig, RoundPhase, RoundServices};
use reaction_games::game::score::difficulty_tier;
use reaction_games::game::variants::{BonusConfig, FastestConfig, MixedConfig};
use reaction_games::{
    ChannelDevice, FastestToGoal, GameVariant, InMemoryScoreStore, MessageBus, MixedContent, NodeId,
    Round, ScoreStore,
};

struct Harness {
    round: Round,
    store: Arc<InMemoryScoreStore>,
    bus: MessageBus,
    commands: mpsc::UnboundedReceiver<DeviceCommand>,
}

fn harness(variant: Arc<dyn GameVariant>, nodes: usize, seed: u64) -> Harness {
    let (device, commands) = ChannelDevice::new();
    let store = Arc::new(InMemoryScoreStore::new());
    let bus = MessageBus::default();
    let services = RoundServices::new(device.into_device(), store.clone(), bus.clone());
    let config = RoundConfig {
        seed: Some(seed),
        ..RoundConfig::default()
    };
    let round = Round::new(variant, node_range("n", nodes), services, config);
    Harness {
        round,
        store,
        bus,
        commands,
    }
}

fn quiet_mixed() -> MixedConfig {
    MixedConfig {
        sword: SpecialRule::NEVER,
        face: SpecialRule::NEVER,
        ..MixedConfig::default()
    }
}

fn lit(round: &Round, kind: ContentKind) -> Option<NodeId> {
    round
        .board_snapshot()
        .into_iter()
        .find(|(_, cell)| cell.kind == kind)
        .map(|(node, _)| node)
}

fn dark(round: &Round) -> NodeId {
    lit(round, ContentKind::Off).expect("a dark node")
}

fn drain_events(rx: &mut broadcast::Receiver<RoundEvent>) -> Vec<RoundEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}

fn drain_commands(rx: &mut mpsc::UnboundedReceiver<DeviceCommand>) -> Vec<DeviceCommand> {
    let mut commands = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        commands.push(cmd);
    }
    commands
}

fn flashes(commands: &[DeviceCommand]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, DeviceCommand::RenderAll { image } if !image.is_blank()))
        .count()
}

fn game_ended_announcements(commands: &[DeviceCommand]) -> Vec<bool> {
    commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::Announce {
                text, high_score, ..
            } if text == "Game Ended" => Some(*high_score),
            _ => None,
        })
        .collect()
}

// =============================================================================
// END CONDITIONS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn fastest_fails_when_board_fills() {
    let mut h = harness(Arc::new(FastestToGoal::default()), 5, 1);
    let mut events = h.round.subscribe_events();
    h.round.start().await.unwrap();

    // Initial placement plus one every 2 s: full after 8 s
    sleep(Duration::from_secs(15)).await;

    let state = h.round.snapshot();
    assert_eq!(state.phase, RoundPhase::Ended);
    let outcome = state.outcome.unwrap();
    assert_eq!(outcome.reason, EndReason::BoardFull);
    assert!(outcome.failure);
    assert_eq!(h.store.submission_count(), 1);

    let elapsed = h.round.elapsed();
    assert!(elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9));

    let events = drain_events(&mut events);
    let placed = events
        .iter()
        .filter(|e| matches!(e, RoundEvent::Placed { kind: ContentKind::Color, .. }))
        .count();
    assert_eq!(placed, 5);
    assert!(matches!(
        events.last(),
        Some(RoundEvent::Ended { high_score: false, .. })
    ));

    // Failures never make the leaderboard, even an empty one
    assert!(h
        .store
        .leaderboard("Fastest to Goal", difficulty_tier(5).code)
        .is_empty());

    // Last node rendered before the flash
    let commands = drain_commands(&mut h.commands);
    let last_render = commands
        .iter()
        .rposition(|c| matches!(c, DeviceCommand::RenderNode { .. }))
        .unwrap();
    let flash = commands
        .iter()
        .position(|c| matches!(c, DeviceCommand::RenderAll { image } if !image.is_blank()))
        .unwrap();
    assert!(last_render < flash);
    assert_eq!(flashes(&commands), 1);
    assert_eq!(
        commands[flash],
        DeviceCommand::RenderAll {
            image: ImageDescriptor::solid(Rgb::RED)
        }
    );
    assert_eq!(game_ended_announcements(&commands), vec![false]);
}

#[tokio::test(start_paused = true)]
async fn sixth_wrong_press_ends_round() {
    let h = harness(Arc::new(MixedContent::new(quiet_mixed())), 8, 2);
    h.round.start().await.unwrap();
    let node = dark(&h.round);

    for expected in 1..=5 {
        let outcome = h.round.press(PressEvent::new(node.clone())).await;
        assert_eq!(outcome, PressOutcome::Miss { wrong: expected });
        assert_eq!(h.round.phase(), RoundPhase::Running);
    }

    match h.round.press(PressEvent::new(node.clone())).await {
        PressOutcome::Ended { outcome } => {
            assert_eq!(outcome.reason, EndReason::TooManyWrong);
            assert!(outcome.failure);
        }
        other => panic!("expected end, got {other:?}"),
    }
    assert_eq!(h.round.snapshot().wrong, 6);

    assert_eq!(h.round.press(PressEvent::new(node)).await, PressOutcome::Ignored);
    assert_eq!(h.round.snapshot().wrong, 6);
    assert_eq!(h.store.submission_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn goal_ends_round_once() {
    let variant = FastestToGoal::new(FastestConfig {
        goal: 3,
        ..FastestConfig::default()
    });
    let h = harness(Arc::new(variant), 5, 3);
    h.round.start().await.unwrap();

    for _ in 0..2 {
        let node = lit(&h.round, ContentKind::Color).unwrap();
        assert!(matches!(h.round.press(PressEvent::new(node)).await, PressOutcome::Hit { .. }));
    }
    let node = lit(&h.round, ContentKind::Color).unwrap();
    match h.round.press(PressEvent::new(node)).await {
        PressOutcome::Ended { outcome } => {
            assert_eq!(outcome.reason, EndReason::GoalReached);
            assert!(!outcome.failure);
        }
        other => panic!("expected end, got {other:?}"),
    }

    assert!(!h.round.end(EndReason::GoalReached).await);
    if let Some(node) = h.round.nodes().first().cloned() {
        assert_eq!(h.round.press(PressEvent::new(node)).await, PressOutcome::Ignored);
    }
    assert_eq!(h.round.snapshot().correct, 3);

    let submissions = h.store.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].description, "Got to 3 in 00:00");
}

#[tokio::test(start_paused = true)]
async fn double_end_runs_sequence_once() {
    let mut h = harness(Arc::new(MixedContent::new(quiet_mixed())), 6, 4);
    h.round.start().await.unwrap();

    let (first, second) = tokio::join!(
        h.round.end(EndReason::ClosedByPlayer),
        h.round.end(EndReason::ClosedByPlayer)
    );
    assert!(first ^ second);
    assert!(!h.round.end(EndReason::ClosedByPlayer).await);

    let commands = drain_commands(&mut h.commands);
    assert_eq!(h.store.submission_count(), 1);
    assert_eq!(flashes(&commands), 1);
    // Empty leaderboard, so this is a high score
    assert_eq!(game_ended_announcements(&commands), vec![true]);
    assert!(commands.contains(&DeviceCommand::RenderAll {
        image: ImageDescriptor::solid(Rgb::GREEN)
    }));
}

#[tokio::test(start_paused = true)]
async fn frowny_face_ends_round() {
    let config = MixedConfig {
        face: SpecialRule {
            chance_one_in: 1,
            ..MixedConfig::default().face
        },
        frowny_one_in: 1,
        sword: SpecialRule::NEVER,
        ..MixedConfig::default()
    };
    let h = harness(Arc::new(MixedContent::new(config)), 6, 5);
    h.round.start().await.unwrap();

    let frowny = lit(&h.round, ContentKind::FrownyFace).unwrap();
    match h.round.press(PressEvent::new(frowny)).await {
        PressOutcome::Ended { outcome } => assert_eq!(outcome.reason, EndReason::FrownyFace),
        other => panic!("expected end, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn smily_face_is_worth_three() {
    let config = MixedConfig {
        face: SpecialRule {
            chance_one_in: 1,
            ..MixedConfig::default().face
        },
        frowny_one_in: 0,
        sword: SpecialRule::NEVER,
        ..MixedConfig::default()
    };
    let h = harness(Arc::new(MixedContent::new(config)), 6, 6);
    h.round.start().await.unwrap();

    let smily = lit(&h.round, ContentKind::SmilyFace).unwrap();
    assert_eq!(
        h.round.press(PressEvent::new(smily)).await,
        PressOutcome::Hit { points: 3, correct: 3 }
    );
    h.round.dispose();
}

#[tokio::test(start_paused = true)]
async fn timed_round_ends_with_success() {
    let config = MixedConfig {
        duration: Duration::from_secs(5),
        ..quiet_mixed()
    };
    let h = harness(Arc::new(MixedContent::new(config)), 4, 7);
    h.round.start().await.unwrap();

    sleep(Duration::from_secs(10)).await;
    let outcome = h.round.snapshot().outcome.unwrap();
    assert_eq!(outcome.reason, EndReason::TimeUp);
    assert!(!outcome.failure);
}

// =============================================================================
// BOARD
// =============================================================================

#[tokio::test(start_paused = true)]
async fn expired_content_is_cleared() {
    let mut h = harness(Arc::new(MixedContent::new(quiet_mixed())), 6, 8);
    let mut events = h.round.subscribe_events();
    h.round.start().await.unwrap();
    let first = lit(&h.round, ContentKind::Color).unwrap();

    sleep(Duration::from_millis(1600)).await;

    let events = drain_events(&mut events);
    assert!(events.contains(&RoundEvent::Expired { node: first.clone() }));
    let commands = drain_commands(&mut h.commands);
    assert!(commands.contains(&DeviceCommand::RenderNode {
        node_id: first.clone(),
        image: ImageDescriptor::Blank,
    }));
    // The expired activation can no longer be scored
    assert_eq!(
        h.round.press(PressEvent::new(first)).await,
        PressOutcome::Miss { wrong: 1 }
    );
    h.round.dispose();
}

#[tokio::test(start_paused = true)]
async fn same_seed_same_placements() {
    let a = harness(Arc::new(MixedContent::new(quiet_mixed())), 8, 99);
    let b = harness(Arc::new(MixedContent::new(quiet_mixed())), 8, 99);
    a.round.start().await.unwrap();
    b.round.start().await.unwrap();

    sleep(Duration::from_millis(3100)).await;
    assert_eq!(a.round.board_snapshot(), b.round.board_snapshot());
    a.round.dispose();
    b.round.dispose();
}

// =============================================================================
// BUS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn presses_arrive_over_bus() {
    let h = harness(Arc::new(MixedContent::new(quiet_mixed())), 6, 9);
    h.round.start().await.unwrap();
    let node = lit(&h.round, ContentKind::Color).unwrap();

    assert_eq!(h.bus.publish_press(PressEvent::new(node)), 1);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.round.snapshot().correct, 1);
    h.round.dispose();
}

#[tokio::test(start_paused = true)]
async fn addressed_updates_apply_to_target_only() {
    let h = harness(Arc::new(MixedContent::new(quiet_mixed())), 6, 10);
    let other = harness(Arc::new(MixedContent::new(quiet_mixed())), 6, 11);
    h.round.start().await.unwrap();

    h.bus.publish_update(h.round.id(), InternalUpdate::adjustment(5, 1));
    h.bus.publish_update(other.round.id(), InternalUpdate::adjustment(40, 0));
    sleep(Duration::from_millis(10)).await;

    let state = h.round.snapshot();
    assert_eq!(state.correct, 5);
    assert_eq!(state.wrong, 1);
    assert_eq!(state.phase, RoundPhase::Running);
    h.round.dispose();
}

// =============================================================================
// BONUS ROUNDS
// =============================================================================

fn sword_config() -> MixedConfig {
    MixedConfig {
        sword: SpecialRule {
            chance_one_in: 1,
            ..MixedConfig::default().sword
        },
        face: SpecialRule::NEVER,
        bonus: BonusConfig {
            crown: SpecialRule::NEVER,
            duration: Duration::from_secs(3),
            ..BonusConfig::default()
        },
        ..MixedConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn sword_runs_bonus_round_and_resumes() {
    let h = harness(Arc::new(MixedContent::new(sword_config())), 6, 12);
    let mut events = h.round.subscribe_events();
    h.round.start().await.unwrap();

    let sword = lit(&h.round, ContentKind::Sword).unwrap();
    assert_eq!(h.round.press(PressEvent::new(sword)).await, PressOutcome::BonusEntered);
    assert_eq!(h.round.phase(), RoundPhase::Paused);
    assert!(h.round.is_bonus_running());

    // Parent ignores presses while paused
    let parent_node = h.round.nodes()[0].clone();
    assert_eq!(h.round.press(PressEvent::new(parent_node)).await, PressOutcome::Ignored);

    // A bonus colour is worth 2
    let child = h.round.bonus_round().unwrap();
    let node = lit(&child, ContentKind::Color).unwrap();
    assert_eq!(
        child.press(PressEvent::new(node)).await,
        PressOutcome::Hit { points: 2, correct: 2 }
    );

    // Bonus round times out after 3 s
    sleep(Duration::from_secs(4)).await;
    assert_eq!(child.phase(), RoundPhase::Ended);

    let state = h.round.snapshot();
    assert_eq!(state.phase, RoundPhase::Running);
    assert_eq!(state.correct, 2);
    assert_eq!(state.wrong, 0);
    assert!(!h.round.is_bonus_running());
    assert_eq!(h.store.submission_count(), 0);

    let events = drain_events(&mut events);
    assert!(events.contains(&RoundEvent::ScoreAdjusted {
        correct_delta: 2,
        wrong_delta: 0,
    }));
    let resumed = events
        .iter()
        .position(|e| *e == RoundEvent::Resumed { correct: 2 })
        .unwrap();
    assert!(events[resumed..]
        .iter()
        .any(|e| matches!(e, RoundEvent::Placed { .. })));
    h.round.dispose();
}

#[tokio::test(start_paused = true)]
async fn force_end_bonus_resumes_without_tally() {
    let h = harness(Arc::new(MixedContent::new(sword_config())), 6, 13);
    h.round.start().await.unwrap();

    let sword = lit(&h.round, ContentKind::Sword).unwrap();
    h.round.press(PressEvent::new(sword)).await;
    let child = h.round.bonus_round().unwrap();
    let node = lit(&child, ContentKind::Color).unwrap();
    child.press(PressEvent::new(node)).await;

    assert!(h.round.force_end_bonus().await);
    assert!(!h.round.force_end_bonus().await);
    assert_eq!(child.phase(), RoundPhase::Ended);
    assert_eq!(h.round.phase(), RoundPhase::Running);
    assert_eq!(h.round.snapshot().correct, 0);
    h.round.dispose();
}

#[tokio::test(start_paused = true)]
async fn ending_parent_disposes_bonus_round() {
    let h = harness(Arc::new(MixedContent::new(sword_config())), 6, 14);
    h.round.start().await.unwrap();

    let sword = lit(&h.round, ContentKind::Sword).unwrap();
    h.round.press(PressEvent::new(sword)).await;
    let child = h.round.bonus_round().unwrap();

    assert!(h.round.end(EndReason::ClosedByPlayer).await);
    assert_eq!(child.phase(), RoundPhase::Ended);
    assert!(h.round.bonus_round().is_none());

    // Nothing arrives later to revive the parent
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.round.phase(), RoundPhase::Ended);
    assert_eq!(h.store.submission_count(), 1);
}

// =============================================================================
// STRESS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn random_presses_end_round_once() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let h = harness(Arc::new(MixedContent::default()), 8, 15);
    let mut events = h.round.subscribe_events();
    h.round.start().await.unwrap();

    let nodes = h.round.nodes().to_vec();
    let mut rng = StdRng::seed_from_u64(15);
    let mut last = h.round.snapshot();

    for _ in 0..400 {
        sleep(Duration::from_millis(rng.gen_range(20..400))).await;
        // Presses land on whichever round is taking them
        let target = h.round.bonus_round().filter(|child| child.phase() == RoundPhase::Running);
        let node = nodes[rng.gen_range(0..nodes.len())].clone();
        match target {
            Some(child) => child.press(PressEvent::new(node)).await,
            None => h.round.press(PressEvent::new(node)).await,
        };

        let state = h.round.snapshot();
        assert!(state.correct >= last.correct);
        assert!(state.wrong >= last.wrong);
        last = state;
        if last.phase == RoundPhase::Ended {
            break;
        }
    }

    // Let a 60 s round run out if presses didn't end it
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.round.phase(), RoundPhase::Ended);
    assert_eq!(h.store.submission_count(), 1);

    let ended = drain_events(&mut events)
        .iter()
        .filter(|e| matches!(e, RoundEvent::Ended { .. }))
        .count();
    assert_eq!(ended, 1);
}
