//! Fixed timestep simulation step
//!
//! Order of one step:
//! 1. Prune stale weld/wheel references, apply held pointer input
//! 2. For each adaptive substep: integrate forces, walls and ground, contacts
//!    (find, correct, solve), weld projection and velocity sync, a
//!    penetration-only pass, velocity clamp
//! 3. Fracture: damage update, shatter queue, shard spawn
//! 4. Wave PDE (water) or decay (land), particles, entry splashes

use glam::Vec2;

use super::body::index_of;
use super::fluid::{entry_splash, immersion};
use super::fracture::{self, ShatterRequest};
use super::integrate::{confine, integrate, substep_count};
use super::solver::{self, Impact};
use super::state::World;
use super::weld::{self, Aggregates};

/// Advance the world by one fixed step
pub fn step(world: &mut World) {
    weld::prune(&mut world.welds, &mut world.wheels, &world.bodies);
    world.apply_held_input();

    let impacts = run_substeps(world);

    // Grace ending this step tightens the limits; re-clamp against them
    for body in &mut world.bodies {
        body.throw_grace = body.throw_grace.saturating_sub(1);
        body.clamp_velocity(&world.tuning);
    }

    for (request, cause) in fracture::evaluate(&mut world.bodies, &impacts, &world.tuning) {
        log::debug!("Body {} breaks ({cause:?}, impulse {:.2})", request.body, request.impulse);
        world.shatters.push(request);
    }
    for request in world.shatters.drain() {
        shatter(world, request);
    }

    let water = world.is_water();
    if water {
        world.wave.step(&world.tuning);
    } else {
        world.wave.decay(&world.tuning);
    }
    let bounds = world.size;
    world.particles.step(&mut world.wave, water, bounds, &world.tuning);

    if water {
        entry_splashes(world);
    }
    world.steps += 1;
}

fn run_substeps(world: &mut World) -> Vec<Impact> {
    let water = world.is_water();
    let bounds = world.bounds();
    let World {
        bodies,
        welds,
        wheels,
        wave,
        tuning,
        ..
    } = world;

    let substeps = substep_count(bodies);
    let step_scale = 1.0 / substeps as f32;
    let iterations = solver::iteration_count(bodies.len(), !wheels.is_empty(), tuning);
    let aggregates = Aggregates::build(bodies, welds);

    let mut impacts = Vec::new();
    for _ in 0..substeps {
        let reactions = integrate(bodies, water.then_some(&*wave), tuning, step_scale);
        for (x, amount) in reactions {
            wave.apply_reaction_impulse(x, amount, tuning.wave_reaction_width);
        }
        impacts.extend(confine(bodies, bounds, tuning));

        let mut pairs = solver::find_contacts(bodies, &aggregates, tuning);
        solver::correct_positions(bodies, &pairs, &aggregates, tuning);
        impacts.extend(solver::solve(bodies, &mut pairs, tuning, step_scale, iterations));

        if !welds.is_empty() {
            for _ in 0..tuning.weld_iterations {
                weld::stabilize_wheel_hosts(bodies, welds, wheels);
                weld::project(bodies, welds, &aggregates, wheels, tuning);
            }
            weld::sync_velocities(bodies, &aggregates, wheels, tuning);
        }
        solver::resolve_penetration(bodies, &aggregates, tuning);

        for body in bodies.iter_mut() {
            body.clamp_velocity(tuning);
        }
    }
    impacts
}

/// Remove a broken body and throw its shards
fn shatter(world: &mut World, request: ShatterRequest) {
    let Some(i) = index_of(&world.bodies, request.body) else {
        return;
    };
    let (center, vel, size, mass) = {
        let b = &world.bodies[i];
        (b.pos, b.vel, b.size(), b.mass)
    };
    world.delete_body(request.body);
    let shards = world
        .particles
        .spawn_shards(center, vel, size, mass, request.impulse, &mut world.rng, &world.tuning);
    log::debug!("Body {} shattered into {shards} shards", request.body);
}

/// Spray for bodies plunging into the water; refreshes the immersion map
fn entry_splashes(world: &mut World) {
    let mut splashes: Vec<(Vec2, usize, Vec2)> = Vec::new();
    for body in &world.bodies {
        let now = immersion(body, &world.wave);
        let prev = world.immersion.insert(body.id, now).unwrap_or(now);
        if let Some(count) = entry_splash(prev, now, body.vel.y, &world.tuning) {
            let at = Vec2::new(body.pos.x, world.wave.surface_y(body.pos.x));
            splashes.push((at, count, body.vel));
        }
    }
    let live = &world.bodies;
    world.immersion.retain(|id, _| index_of(live, *id).is_some());
    for (at, count, vel) in splashes {
        world.particles.spawn_entry_splash(at, count, vel, &mut world.rng, &world.tuning);
    }
}
