use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use terrain_racer::debug_builders::DebugLines;
use terrain_racer::road::RoadManager;
use terrain_racer::state::Action;
use terrain_racer::terrain::HeightField;
use terrain_racer::{GameConfig, PhysicsWorld};

/// Usage: terrain-racer [config.json] [ticks]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => GameConfig::default(),
    };
    let max_ticks = match args.get(2) {
        Some(n) => Some(n.parse::<u64>().with_context(|| format!("tick count {n:?}"))?),
        None => None,
    };

    info!("starting terrain-racer");

    let terrain = Arc::new(HeightField::new(&config.terrain.field)?);
    let mut world = PhysicsWorld::new(config.physics.clone(), Arc::clone(&terrain), config.terrain.chunks.clone())?;
    let player = world.spawn_vehicle(config.vehicle.clone(), 0.0, 0.0)?;
    let physics = Arc::new(Mutex::new(world));

    // Road generation runs beside the tick loop and installs its collider when done
    let roads = Arc::new(RoadManager::new(config.road.clone(), terrain)?);
    {
        let roads = Arc::clone(&roads);
        let physics = Arc::clone(&physics);
        tokio::spawn(async move {
            let mut lines = DebugLines::new();
            match roads.generate(&mut lines).await {
                Ok(road) => {
                    let installed = physics.lock().await.set_road(&road);
                    info!(installed, debug_lines = lines.len(), "road ready");
                }
                Err(err) => error!(%err, "road generation failed"),
            }
        });
    }

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f32(config.physics.dt));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("shutting down");
                roads.cancel();
                break;
            }
        }

        let mut phys = physics.lock().await;

        // scripted lap: full throttle, weaving every few seconds, drifting through the turns
        let t = phys.tick as f32 * config.physics.dt;
        let weave = (t * 0.5).sin();
        if let Some(input) = phys.input_mut(player) {
            input.set(Action::Accelerate, 1.0);
            input.set(Action::SteerLeft, weave.max(0.0));
            input.set(Action::SteerRight, (-weave).max(0.0));
            input.set(Action::Drift, if weave.abs() > 0.8 { 1.0 } else { 0.0 });
        }

        phys.step();

        if phys.tick % 60 == 0 {
            let snapshot = serde_json::to_string(&phys.snapshot())?;
            info!(%snapshot, "tick");
        }
        if max_ticks.is_some_and(|max| phys.tick >= max) {
            info!(ticks = phys.tick, "tick limit reached");
            roads.cancel();
            break;
        }
    }

    Ok(())
}
