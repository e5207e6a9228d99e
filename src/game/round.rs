//! Round Controller
//!
//! One `Round` is one game instance: it owns the round state machine, the
//! board, the placement policy, the periodic driver and (through its
//! `SubGameHost`) any nested bonus round.
//!
//! ```text
//! NotStarted ──start──▶ Running ◀──resume── Paused
//!                          │  └──sword──────▶  │
//!                          ▼                   ▼
//!                        Ended ◀───────────────┘
//! ```
//!
//! Two execution contexts drive a round: the scheduler task and whoever
//! delivers presses (the bus listener or a direct `press` call). Every
//! section that reads the phase and then mutates the board, the scores or
//! the display runs under the state lock, so a round is ended exactly once
//! and nothing is drawn by the game after that point. The state lock is
//! never held across an `.await`.
//!
//! Lock order: state, board slot, engine, scheduler.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::core::image::{ImageDescriptor, Rgb};
use crate::core::node::{NodeId, RoundId};
use crate::core::rng::{derive_round_seed, DeterministicRng};
use crate::device::bus::{MessageBus, DEFAULT_BUS_CAPACITY};
use crate::device::protocol::{AddressedUpdate, InternalUpdate, PressEvent};
use crate::device::sink::Device;
use crate::game::board::BoardState;
use crate::game::content::ButtonState;
use crate::game::events::{Cue, EndReason, RoundEvent, RoundOutcome};
use crate::game::placer::{ContentPlacer, PlacementContext, PlacementTrigger};
use crate::game::press::{PressAction, PressOutcome};
use crate::game::scheduler::{ContentScheduler, TickFlow};
use crate::game::score::RoundSummary;
use crate::game::subgame::SubGameHost;
use crate::game::variants::{GameVariant, RoundRules};
use crate::store::ScoreStore;

/// Buffered events per round before slow subscribers lag.
pub const EVENT_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// STATE
// =============================================================================

/// Lifecycle phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Created, never started
    #[default]
    NotStarted,
    /// Accepting presses, scheduler running
    Running,
    /// Suspended while a bonus round plays
    Paused,
    /// Terminal
    Ended,
}

impl RoundPhase {
    /// Running or paused.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, RoundPhase::Running | RoundPhase::Paused)
    }
}

/// Scores and timing for the current (or last) round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundState {
    /// Lifecycle phase
    pub phase: RoundPhase,
    /// When the round started
    pub started_at: Option<Instant>,
    /// When the round ended
    pub ended_at: Option<Instant>,
    /// Correct score
    pub correct: u32,
    /// Wrong score
    pub wrong: u32,
    /// Goal, if the variant has one
    pub goal: Option<u32>,
    /// Node count at start
    pub board_size: usize,
    /// How the round ended
    pub outcome: Option<RoundOutcome>,
}

impl RoundState {
    fn running(goal: Option<u32>, board_size: usize, now: Instant) -> Self {
        Self {
            phase: RoundPhase::Running,
            started_at: Some(now),
            goal,
            board_size,
            ..Self::default()
        }
    }

    /// Time played: zero before start, frozen at end.
    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    fn goal_reached(&self) -> bool {
        self.goal.is_some_and(|goal| self.correct >= goal)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Round settings shared by all variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundConfig {
    /// How long the win/lose flash stays up
    pub flash_duration: Duration,
    /// Fixed RNG seed; derived from the round id when absent
    pub seed: Option<u64>,
    /// Buffer size for bus topics
    pub bus_capacity: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            flash_duration: Duration::from_millis(3000),
            seed: None,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl RoundConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            flash_duration: std::env::var("REACTION_FLASH_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.flash_duration),
            seed: std::env::var("REACTION_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            bus_capacity: std::env::var("REACTION_BUS_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bus_capacity),
        }
    }
}

/// Collaborators a round talks to.
#[derive(Clone)]
pub struct RoundServices {
    /// Output devices
    pub device: Device,
    /// Score persistence
    pub store: Arc<dyn ScoreStore>,
    /// Inbound presses and updates
    pub bus: MessageBus,
}

impl RoundServices {
    /// Bundle collaborators.
    pub fn new(device: Device, store: Arc<dyn ScoreStore>, bus: MessageBus) -> Self {
        Self { device, store, bus }
    }
}

/// Where a finished round reports.
#[derive(Debug)]
pub enum Completion {
    /// Submit the score record and play the end flash
    Persist,
    /// Send the tally to the parent round instead
    Parent(mpsc::UnboundedSender<InternalUpdate>),
}

/// Round errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    /// Board too small for the variant
    #[error("{variant} needs at least {required} nodes, got {available}")]
    InsufficientNodes {
        /// Variant name
        variant: &'static str,
        /// Minimum nodes
        required: usize,
        /// Nodes supplied
        available: usize,
    },

    /// Start called on a running or paused round
    #[error("round is already running")]
    AlreadyRunning,
}

// =============================================================================
// ROUND
// =============================================================================

struct Engine {
    placer: Box<dyn ContentPlacer>,
    rng: DeterministicRng,
    misses: usize,
}

impl Engine {
    fn new(placer: Box<dyn ContentPlacer>, seed: u64) -> Self {
        Self {
            placer,
            rng: DeterministicRng::new(seed),
            misses: 0,
        }
    }
}

enum PressStep {
    Done(PressOutcome),
    End(EndReason, Option<Duration>),
    Bonus(Arc<dyn GameVariant>),
}

struct RoundInner {
    id: RoundId,
    variant: Arc<dyn GameVariant>,
    rules: RoundRules,
    nodes: Vec<NodeId>,
    seed: u64,
    config: RoundConfig,
    services: RoundServices,
    /// `Some` for nested rounds; the sender is dropped once used or disposed
    parent: Option<Mutex<Option<mpsc::UnboundedSender<InternalUpdate>>>>,
    state: Mutex<RoundState>,
    board: Mutex<Arc<BoardState>>,
    engine: Mutex<Engine>,
    scheduler: Mutex<Option<ContentScheduler>>,
    listener: Mutex<Option<broadcast::Sender<()>>>,
    host: SubGameHost,
    events: broadcast::Sender<RoundEvent>,
}

/// Handle to one game instance. Clones share the instance.
#[derive(Clone)]
pub struct Round {
    inner: Arc<RoundInner>,
}

impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Round")
            .field("id", &self.inner.id)
            .field("variant", &self.inner.variant.name())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Round {
    /// Top-level round that persists its score.
    pub fn new(
        variant: Arc<dyn GameVariant>,
        nodes: Vec<NodeId>,
        services: RoundServices,
        config: RoundConfig,
    ) -> Self {
        Self::with_completion(variant, nodes, services, config, Completion::Persist)
    }

    /// Round with an explicit completion path.
    pub fn with_completion(
        variant: Arc<dyn GameVariant>,
        mut nodes: Vec<NodeId>,
        services: RoundServices,
        config: RoundConfig,
        completion: Completion,
    ) -> Self {
        nodes.sort();
        nodes.dedup();

        let id = RoundId::generate();
        let seed = config
            .seed
            .unwrap_or_else(|| derive_round_seed(id.as_bytes(), &nodes));
        let rules = variant.rules();
        let parent = match completion {
            Completion::Persist => None,
            Completion::Parent(tx) => Some(Mutex::new(Some(tx))),
        };
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = RoundInner {
            id,
            rules,
            seed,
            parent,
            board: Mutex::new(Arc::new(BoardState::new(&nodes))),
            engine: Mutex::new(Engine::new(variant.placer(), seed)),
            state: Mutex::new(RoundState::default()),
            scheduler: Mutex::new(None),
            listener: Mutex::new(None),
            host: SubGameHost::new(),
            variant,
            nodes,
            config,
            services,
            events,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Instance id; bus updates addressed to it are absorbed.
    pub fn id(&self) -> RoundId {
        self.inner.id
    }

    /// The variant this round plays.
    pub fn variant(&self) -> &Arc<dyn GameVariant> {
        &self.inner.variant
    }

    /// RNG seed used for placement.
    pub fn seed(&self) -> u64 {
        self.inner.seed
    }

    /// Nodes on this board, sorted.
    pub fn nodes(&self) -> &[NodeId] {
        &self.inner.nodes
    }

    /// Start a new round: fresh scores, fresh board, first placement,
    /// then the scheduler and the bus listener.
    pub async fn start(&self) -> Result<(), RoundError> {
        self.inner.begin()
    }

    /// Handle one press.
    pub async fn press(&self, press: PressEvent) -> PressOutcome {
        self.inner.handle_press(press).await
    }

    /// End the round with the reason's default failure tag.
    ///
    /// Returns false if the round was not active (already ended, never
    /// started); repeated calls are no-ops.
    pub async fn end(&self, reason: EndReason) -> bool {
        self.inner.finish(RoundOutcome::from_reason(reason), None).await
    }

    /// End the round with an explicit outcome.
    pub async fn end_with(&self, outcome: RoundOutcome) -> bool {
        self.inner.finish(outcome, None).await
    }

    /// Absorb a score update as if it came from this round's bonus round.
    pub async fn apply_update(&self, update: InternalUpdate) {
        self.inner.absorb(update).await;
    }

    /// Stop everything without the end sequence. Safe to repeat.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Copy of the round state.
    pub fn snapshot(&self) -> RoundState {
        lock(&self.inner.state).clone()
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        lock(&self.inner.state).phase
    }

    /// Copy of the board.
    pub fn board_snapshot(&self) -> Vec<(NodeId, ButtonState)> {
        self.inner.board().snapshot()
    }

    /// Time played.
    pub fn elapsed(&self) -> Duration {
        lock(&self.inner.state).elapsed(Instant::now())
    }

    /// Subscribe to this round's events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RoundEvent> {
        self.inner.events.subscribe()
    }

    /// Bonus round currently held, if any.
    pub fn bonus_round(&self) -> Option<Round> {
        self.inner.host.current()
    }

    /// A held bonus round is still playing.
    pub fn is_bonus_running(&self) -> bool {
        self.inner.host.is_running()
    }

    /// Dispose the held bonus round and resume play without its tally.
    pub async fn force_end_bonus(&self) -> bool {
        if !self.inner.host.dispose() {
            return false;
        }
        self.inner
            .absorb(InternalUpdate::completed(0, 0, "Bonus round closed"))
            .await;
        true
    }
}

impl RoundInner {
    fn state(&self) -> MutexGuard<'_, RoundState> {
        lock(&self.state)
    }

    fn board(&self) -> Arc<BoardState> {
        lock(&self.board).clone()
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        lock(&self.engine)
    }

    fn emit(&self, event: RoundEvent) {
        // No subscribers is normal.
        let _ = self.events.send(event);
    }

    fn play(&self, cue: Cue) {
        if let Some(clip) = self.variant.clip(cue) {
            self.services.device.audio.play_clip(clip);
        }
    }

    fn play_miss(&self) {
        if let Some(clip) = self.variant.clip(Cue::Miss) {
            self.services.device.audio.play_clip(clip);
            return;
        }
        let clips = self.variant.miss_clips();
        if clips.is_empty() {
            return;
        }
        let clip = {
            let mut engine = self.engine();
            let clip = clips[engine.misses % clips.len()];
            engine.misses += 1;
            clip
        };
        self.services.device.audio.play_clip(clip);
    }

    fn announce_score(&self) {
        self.services.device.announcer.announce("Score Update", false, false);
    }

    // ===== LIFECYCLE =====

    fn begin(self: &Arc<Self>) -> Result<(), RoundError> {
        if self.nodes.len() < self.rules.min_nodes {
            return Err(RoundError::InsufficientNodes {
                variant: self.variant.name(),
                required: self.rules.min_nodes,
                available: self.nodes.len(),
            });
        }

        {
            let mut st = self.state();
            if st.phase.is_active() {
                return Err(RoundError::AlreadyRunning);
            }

            let now = Instant::now();
            *st = RoundState::running(self.rules.goal, self.nodes.len(), now);
            let board = Arc::new(BoardState::new(&self.nodes));
            *lock(&self.board) = Arc::clone(&board);
            *self.engine() = Engine::new(self.variant.placer(), self.seed);

            info!(
                "Round {} started: {} on {} nodes (seed {})",
                self.id.short(),
                self.variant.name(),
                self.nodes.len(),
                self.seed
            );
            self.services.device.renderer.render_all(&ImageDescriptor::Blank);
            self.play(Cue::RoundStart);
            self.emit(RoundEvent::Started {
                round: self.id,
                board_size: self.nodes.len(),
            });
            self.place_cycle(&board, PlacementTrigger::Initial, now);
        }

        self.spawn_listener();
        self.arm_scheduler();
        Ok(())
    }

    /// Run the end sequence once. Returns false if the round was not active.
    async fn finish(self: &Arc<Self>, outcome: RoundOutcome, settle: Option<Duration>) -> bool {
        let summary = {
            let mut st = self.state();
            if !st.phase.is_active() {
                debug!("Round {} end ignored in phase {:?}", self.id.short(), st.phase);
                return false;
            }
            let now = Instant::now();
            st.phase = RoundPhase::Ended;
            st.ended_at = Some(now);
            st.outcome = Some(outcome);
            RoundSummary {
                board_size: st.board_size,
                correct: st.correct,
                wrong: st.wrong,
                goal: st.goal,
                elapsed: st.elapsed(now),
                outcome,
            }
        };

        info!(
            "Round {} ended: {} ({} correct, {} wrong, failure={})",
            self.id.short(),
            outcome.reason.message(),
            summary.correct,
            summary.wrong,
            outcome.failure
        );

        self.stop_scheduler();
        self.host.dispose();

        if let Some(delay) = settle {
            sleep(delay).await;
        }
        self.board().flush();

        let renderer = &self.services.device.renderer;
        let link = self.parent.as_ref().map(|slot| lock(slot).take());
        let high_score = match link {
            None => {
                let record = self.variant.score_record(&summary);
                let high = match self.services.store.submit_score(&record) {
                    Ok(high) => high,
                    Err(e) => {
                        error!("Failed to submit score for round {}: {}", self.id.short(), e);
                        false
                    }
                };
                let flash = if high { Rgb::GREEN } else { Rgb::RED };
                renderer.render_all(&ImageDescriptor::solid(flash));
                sleep(self.config.flash_duration).await;
                renderer.render_all(&ImageDescriptor::Blank);
                self.services.device.announcer.announce("Game Ended", true, high);
                high
            }
            Some(Some(tx)) => {
                renderer.render_all(&ImageDescriptor::Blank);
                let update =
                    InternalUpdate::completed(summary.correct, summary.wrong, outcome.reason.message());
                if tx.send(update).is_err() {
                    debug!("Round {} parent no longer listening", self.id.short());
                }
                false
            }
            Some(None) => false,
        };

        self.emit(RoundEvent::Ended {
            outcome,
            correct: summary.correct,
            wrong: summary.wrong,
            high_score,
        });
        self.stop_listener();
        true
    }

    fn dispose(&self) {
        let was_active = {
            let mut st = self.state();
            if st.phase.is_active() {
                st.phase = RoundPhase::Ended;
                st.ended_at = Some(Instant::now());
                true
            } else {
                false
            }
        };
        if let Some(slot) = &self.parent {
            lock(slot).take();
        }
        self.stop_scheduler();
        self.host.dispose();
        self.stop_listener();
        self.board().flush();
        if was_active {
            info!("Round {} disposed", self.id.short());
        }
    }

    // ===== SCHEDULER =====

    fn arm_scheduler(self: &Arc<Self>) {
        let st = self.state();
        if st.phase != RoundPhase::Running {
            return;
        }

        let weak = Arc::downgrade(self);
        let label = format!("{}/{}", self.variant.name(), self.id.short());
        let scheduler = ContentScheduler::spawn(label, self.rules.cadence, move |tick| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.on_tick(tick).await,
                    None => TickFlow::Break(()),
                }
            }
        });

        if let Some(old) = lock(&self.scheduler).replace(scheduler) {
            old.cancel();
        }
        drop(st);
    }

    fn stop_scheduler(&self) {
        if let Some(scheduler) = lock(&self.scheduler).take() {
            scheduler.cancel();
        }
    }

    async fn on_tick(self: Arc<Self>, tick: u64) -> TickFlow {
        let ending = {
            let st = self.state();
            if st.phase != RoundPhase::Running {
                return TickFlow::Continue(());
            }
            let now = Instant::now();

            if self.rules.duration.is_some_and(|limit| st.elapsed(now) >= limit) {
                Some((EndReason::TimeUp, None))
            } else {
                let board = self.board();
                for node in board.sweep_expired(now) {
                    self.services.device.renderer.render_node(&node, &ImageDescriptor::Blank);
                    self.emit(RoundEvent::Expired { node });
                }
                if self.rules.cadence.placement_due(tick) {
                    self.place_cycle(&board, PlacementTrigger::Scheduled, now);
                }
                self.board_full(&board)
            }
        };

        if let Some((reason, settle)) = ending {
            self.finish(RoundOutcome::from_reason(reason), settle).await;
        }
        TickFlow::Continue(())
    }

    /// Run the placer once and render what it lit. Caller holds the state lock.
    fn place_cycle(&self, board: &BoardState, trigger: PlacementTrigger, now: Instant) {
        let mut engine = self.engine();
        let Engine { placer, rng, .. } = &mut *engine;

        let mut ctx = PlacementContext::new(board, rng, now, trigger);
        placer.next(&mut ctx);
        let placements = ctx.into_placements();

        for placement in placements {
            let image = self.variant.image_for(placement.kind, rng);
            self.services.device.renderer.render_node(&placement.node, &image);
            debug!(
                "Round {} placed {:?} on {} ({:?})",
                self.id.short(),
                placement.kind,
                placement.node,
                trigger
            );
            self.emit(RoundEvent::Placed {
                node: placement.node,
                kind: placement.kind,
            });
        }
    }

    fn board_full(&self, board: &BoardState) -> Option<(EndReason, Option<Duration>)> {
        let delay = self.rules.board_full_delay?;
        board.is_full().then_some((EndReason::BoardFull, Some(delay)))
    }

    // ===== PRESSES =====

    async fn handle_press(self: &Arc<Self>, press: PressEvent) -> PressOutcome {
        let step = {
            let mut st = self.state();
            if st.phase != RoundPhase::Running {
                debug!("Round {} ignoring press on {} ({:?})", self.id.short(), press.node_id, st.phase);
                return PressOutcome::Ignored;
            }

            let node = &press.node_id;
            let board = self.board();
            let kind = board.take(node);
            if kind.is_active() {
                self.services.device.renderer.render_node(node, &ImageDescriptor::Blank);
            }
            let now = Instant::now();

            match self.variant.resolve_press(kind) {
                PressAction::Hit { points, advance, cue } => {
                    st.correct = st.correct.saturating_add(points);
                    let correct = st.correct;
                    debug!("Round {} hit {:?} on {} (+{})", self.id.short(), kind, node, points);
                    if let Some(cue) = cue {
                        self.play(cue);
                    }
                    self.emit(RoundEvent::Hit {
                        node: node.clone(),
                        kind,
                        points,
                        correct,
                    });
                    self.announce_score();

                    if st.goal_reached() {
                        PressStep::End(EndReason::GoalReached, None)
                    } else {
                        if advance {
                            self.place_cycle(&board, PlacementTrigger::Advance, now);
                        }
                        match self.board_full(&board) {
                            Some((reason, settle)) => PressStep::End(reason, settle),
                            None => PressStep::Done(PressOutcome::Hit { points, correct }),
                        }
                    }
                }
                PressAction::Miss { penalize, advance } => {
                    if penalize {
                        st.wrong = st.wrong.saturating_add(1);
                    }
                    let wrong = st.wrong;
                    debug!("Round {} miss on {} (wrong={})", self.id.short(), node, wrong);
                    self.play_miss();
                    self.emit(RoundEvent::Miss {
                        node: node.clone(),
                        wrong,
                    });
                    self.announce_score();

                    if self.rules.failure_threshold.is_some_and(|limit| wrong > limit) {
                        self.play(Cue::TooManyWrong);
                        PressStep::End(EndReason::TooManyWrong, None)
                    } else {
                        if advance {
                            self.place_cycle(&board, PlacementTrigger::Advance, now);
                        }
                        match self.board_full(&board) {
                            Some((reason, settle)) => PressStep::End(reason, settle),
                            None => PressStep::Done(PressOutcome::Miss { wrong }),
                        }
                    }
                }
                PressAction::EnterBonus => match self.variant.bonus_variant() {
                    Some(bonus) => {
                        st.phase = RoundPhase::Paused;
                        board.flush();
                        PressStep::Bonus(bonus)
                    }
                    None => {
                        warn!("Round {} has no bonus round for {:?}", self.id.short(), kind);
                        PressStep::Done(PressOutcome::Ignored)
                    }
                },
                PressAction::Fail(reason) => {
                    if reason == EndReason::FrownyFace {
                        self.play(Cue::FrownyFace);
                    }
                    PressStep::End(reason, None)
                }
            }
        };

        match step {
            PressStep::Done(outcome) => outcome,
            PressStep::End(reason, settle) => {
                let outcome = RoundOutcome::from_reason(reason);
                self.finish(outcome, settle).await;
                let outcome = self.state().outcome.unwrap_or(outcome);
                PressOutcome::Ended { outcome }
            }
            PressStep::Bonus(variant) => self.enter_bonus(variant).await,
        }
    }

    // ===== BONUS ROUNDS =====

    async fn enter_bonus(self: &Arc<Self>, variant: Arc<dyn GameVariant>) -> PressOutcome {
        self.stop_scheduler();
        self.play(Cue::BonusStart);

        let config = RoundConfig {
            seed: Some(self.engine().rng.next_u64()),
            ..self.config.clone()
        };
        let entered = self
            .host
            .enter(variant, self.nodes.clone(), self.services.clone(), config)
            .await;

        match entered {
            Ok((child, updates)) => {
                if self.state().phase == RoundPhase::Ended {
                    // Ended while the bonus round was starting.
                    self.host.dispose();
                    return PressOutcome::Ignored;
                }
                info!("Round {} paused for bonus round {}", self.id.short(), child.id().short());
                self.emit(RoundEvent::BonusEntered { child: child.id() });
                Self::watch_bonus(Arc::downgrade(self), updates);
                PressOutcome::BonusEntered
            }
            Err(e) => {
                error!("Round {} could not start bonus round: {}", self.id.short(), e);
                self.absorb(InternalUpdate::completed(0, 0, e.to_string())).await;
                PressOutcome::Ignored
            }
        }
    }

    fn watch_bonus(round: Weak<Self>, mut updates: mpsc::UnboundedReceiver<InternalUpdate>) {
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                let Some(inner) = round.upgrade() else {
                    return;
                };
                let ended = update.ended;
                inner.absorb(update).await;
                if ended {
                    return;
                }
            }
            debug!("Bonus round dropped without reporting");
        });
    }

    /// Fold an update into the scores; an `ended` update resumes a paused round.
    async fn absorb(self: &Arc<Self>, update: InternalUpdate) {
        let (resumed, ending) = {
            let mut st = self.state();
            if !st.phase.is_active() {
                debug!("Round {} ignoring update in phase {:?}", self.id.short(), st.phase);
                return;
            }

            st.correct = st.correct.saturating_add(update.correct_delta);
            st.wrong = st.wrong.saturating_add(update.wrong_delta);
            self.emit(RoundEvent::ScoreAdjusted {
                correct_delta: update.correct_delta,
                wrong_delta: update.wrong_delta,
            });
            self.services
                .device
                .announcer
                .announce("Internal Score Update", false, false);

            let mut resumed = false;
            let mut ending = None;
            if update.ended && st.phase == RoundPhase::Paused {
                st.phase = RoundPhase::Running;
                resumed = true;
                info!(
                    "Round {} resumed with {} correct ({})",
                    self.id.short(),
                    st.correct,
                    update.note
                );

                let board = Arc::new(BoardState::new(&self.nodes));
                *lock(&self.board) = Arc::clone(&board);
                self.services.device.renderer.render_all(&ImageDescriptor::Blank);
                self.play(Cue::BonusBeaten);
                self.emit(RoundEvent::Resumed { correct: st.correct });
                self.place_cycle(&board, PlacementTrigger::Resumed, Instant::now());
                ending = self.board_full(&board);
            }

            if st.goal_reached() {
                ending = Some((EndReason::GoalReached, None));
            } else if self.rules.failure_threshold.is_some_and(|limit| st.wrong > limit) {
                ending = Some((EndReason::TooManyWrong, None));
            }
            (resumed, ending)
        };

        if resumed {
            self.host.dispose();
        }
        match ending {
            Some((reason, settle)) => {
                self.finish(RoundOutcome::from_reason(reason), settle).await;
            }
            None if resumed => self.arm_scheduler(),
            None => {}
        }
    }

    // ===== BUS LISTENER =====

    fn spawn_listener(self: &Arc<Self>) {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        if let Some(old) = lock(&self.listener).replace(shutdown_tx) {
            let _ = old.send(());
        }

        let mut presses = self.services.bus.subscribe_presses();
        let mut updates = self.services.bus.subscribe_updates();
        let round = Arc::downgrade(self);
        let id = self.id;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    press = presses.recv() => match press {
                        Ok(press) => {
                            let Some(inner) = round.upgrade() else { break };
                            inner.handle_press(press).await;
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!("Round {} dropped {} presses", id.short(), n);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    update = updates.recv() => match update {
                        Ok(AddressedUpdate { target, update }) if target == id => {
                            let Some(inner) = round.upgrade() else { break };
                            inner.absorb(update).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            warn!("Round {} dropped {} updates", id.short(), n);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Round {} listener stopped", id.short());
        });
    }

    fn stop_listener(&self) {
        if let Some(tx) = lock(&self.listener).take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RoundInner {
    fn drop(&mut self) {
        // Last handle gone without dispose: stop the background tasks.
        self.stop_scheduler();
        self.stop_listener();
        self.host.dispose();
    }
}
