//! Reaction Games Demo
//!
//! Runs one mixed-content round on a simulated 8-node board, with a
//! simulated player pressing lit targets after a human-ish reaction delay.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use reaction_games::{
    core::{
        image::{ImageDescriptor, Pattern, Sprite},
        node::node_range,
    },
    game::{events::RoundEvent, score::difficulty_tier},
    ChannelDevice, DeterministicRng, DeviceCommand, GameVariant, InMemoryScoreStore,
    JsonFileScoreStore, MessageBus, MixedContent, NodeId, PressEvent, Round, RoundConfig,
    RoundServices, ScoreStore, VERSION,
};

const DEFAULT_FILTER: &str = if cfg!(feature = "debug-tracing") {
    "debug"
} else {
    "info"
};

type LitNodes = Arc<Mutex<BTreeSet<NodeId>>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Reaction Games v{}", VERSION);

    let config = RoundConfig::from_env();
    let store: Arc<dyn ScoreStore> = match std::env::var("REACTION_SCORE_FILE") {
        Ok(path) => Arc::new(
            JsonFileScoreStore::open(&path).with_context(|| format!("Failed to open score file {path}"))?,
        ),
        Err(_) => Arc::new(InMemoryScoreStore::new()),
    };

    demo_round(config, store).await
}

/// Play one mixed round against the simulated player.
async fn demo_round(config: RoundConfig, store: Arc<dyn ScoreStore>) -> Result<()> {
    info!("=== Starting Demo Round ===");

    let bus = MessageBus::new(config.bus_capacity);
    let (device, commands) = ChannelDevice::new();
    let services = RoundServices::new(device.into_device(), Arc::clone(&store), bus.clone());
    let variant: Arc<dyn GameVariant> = Arc::new(MixedContent::default());
    let round = Round::new(Arc::clone(&variant), node_range("node", 8), services, config);

    info!("Round ID: {}", round.id().to_uuid_string());
    info!("RNG Seed: {}", round.seed());

    let lit: LitNodes = Arc::new(Mutex::new(BTreeSet::new()));
    tokio::spawn(simulated_board(commands, Arc::clone(&lit)));
    tokio::spawn(simulated_player(bus, lit, round.seed()));

    let mut events = round.subscribe_events();
    round.start().await.context("Failed to start round")?;

    loop {
        match events.recv().await {
            Ok(RoundEvent::BonusEntered { child }) => info!("Sword pressed, bonus round {}", child),
            Ok(RoundEvent::Resumed { correct }) => info!("Back from the bonus round with {} correct", correct),
            Ok(RoundEvent::Ended {
                outcome,
                correct,
                wrong,
                high_score,
            }) => {
                info!(
                    "Round over: {} ({} correct, {} wrong, high score: {})",
                    outcome.reason.message(),
                    correct,
                    wrong,
                    high_score
                );
                break;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => warn!("Missed {} round events", n),
            Err(RecvError::Closed) => break,
        }
    }

    info!("=== Leaderboard ===");
    let tier = difficulty_tier(round.nodes().len());
    for (i, record) in store.leaderboard(variant.name(), tier.code).iter().enumerate() {
        info!("#{} [{}]: {}", i + 1, record.difficulty_label, record.description);
    }
    Ok(())
}

/// Stand-in for the hardware bridge: tracks which nodes show a target.
async fn simulated_board(mut commands: mpsc::UnboundedReceiver<DeviceCommand>, lit: LitNodes) {
    while let Some(cmd) = commands.recv().await {
        if let Ok(json) = cmd.to_json() {
            debug!("device <- {}", json);
        }
        let mut lit = lit.lock().unwrap_or_else(PoisonError::into_inner);
        match cmd {
            DeviceCommand::RenderNode { node_id, image } => {
                if is_target(&image) {
                    lit.insert(node_id);
                } else {
                    lit.remove(&node_id);
                }
            }
            DeviceCommand::RenderAll { .. } => lit.clear(),
            DeviceCommand::PlayClip { clip_id } => debug!("Playing {}", clip_id),
            DeviceCommand::Announce { text, high_score, .. } => {
                debug!("Announcement: {} (high score: {})", text, high_score);
            }
        }
    }
}

/// What the simulated player is willing to press.
fn is_target(image: &ImageDescriptor) -> bool {
    matches!(
        image,
        ImageDescriptor::Pattern {
            pattern: Pattern::AllOneColor,
            ..
        } | ImageDescriptor::Sprite {
            sprite: Sprite::Sword | Sprite::Crown,
        }
    )
}

/// Presses a lit target every 350-900 ms, and a dark node now and then.
async fn simulated_player(bus: MessageBus, lit: LitNodes, seed: u64) {
    let mut rng = DeterministicRng::new(seed ^ 0x5EED);
    let nodes = node_range("node", 8);

    loop {
        sleep(Duration::from_millis(u64::from(rng.next_int_range(350, 900)))).await;

        let target = {
            let lit = lit.lock().unwrap_or_else(PoisonError::into_inner);
            let lit: Vec<NodeId> = lit.iter().cloned().collect();
            if rng.chance(12) {
                rng.choose(&nodes).cloned()
            } else {
                rng.choose(&lit).cloned()
            }
        };

        if let Some(node) = target {
            bus.publish_press(PressEvent::new(node));
        }
    }
}
