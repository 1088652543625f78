//! Strata Runtime
//!
//! Minimal binary that boots the engine and drives a small simulation
//! through the public API: register components and a movement system,
//! spawn entities, tick, and report.

mod settings;

use std::path::PathBuf;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use strata_core::{World, WorldLimits};

use settings::Settings;

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Copy, Clone, Pod, Zeroable)]
#[repr(C)]
struct Velocity {
    x: f32,
    y: f32,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;

    tracing::info!("Strata Engine v{}", strata_core::VERSION);
    tracing::info!(?settings, "booting world");

    let mut world = World::new(WorldLimits {
        max_entities: settings.world.max_entities,
        max_components: settings.world.max_components,
        max_systems: settings.world.max_systems,
    })?;

    let position = world.register_component("position", std::mem::size_of::<Position>())?;
    let velocity = world.register_component("velocity", std::mem::size_of::<Velocity>())?;

    let mover = world.register_system(
        "move",
        Box::new(move |view| {
            for at in 0..view.archetype_count() {
                let velocities = view
                    .column::<Velocity>(at, velocity)
                    .expect("matched archetypes carry velocity")
                    .to_vec();
                let positions = view
                    .column_mut::<Position>(at, position)
                    .expect("matched archetypes carry position");
                for (pos, vel) in positions.iter_mut().zip(velocities.iter()) {
                    pos.x += vel.x;
                    pos.y += vel.y;
                }
            }
        }),
        &[position, velocity],
    )?;

    let mut entities = Vec::with_capacity(settings.simulation.entity_count);
    for i in 0..settings.simulation.entity_count {
        let entity = world.create_entity()?;
        let spread = i as f32;
        world.set(entity, position, Position { x: spread, y: -spread })?;
        world.set(
            entity,
            velocity,
            Velocity {
                x: 0.5 + spread * 0.001,
                y: 1.0,
            },
        )?;
        entities.push(entity);
    }
    tracing::info!(
        entities = world.entity_count(),
        archetypes = world.archetype_count(),
        "world populated"
    );

    for _ in 0..settings.simulation.ticks {
        world.update_system(mover)?;
    }

    let probe = entities[0];
    if let Some(pos) = world.get::<Position>(probe, position) {
        tracing::info!(x = pos.x, y = pos.y, "probe entity after simulation");
    }

    tracing::info!("simulation complete");
    Ok(())
}
