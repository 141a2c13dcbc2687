//! Slop Sandbox entry point
//!
//! Runs a scripted headless scene on the fixed-step clock and reports the
//! outcome. A windowed host drives `Sandbox` the same way and draws its
//! snapshots. Pass `--json` to print the final snapshot.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec2;
    use slop_sandbox::consts::SIM_DT;
    use slop_sandbox::sim::{KeyCommand, Location, MaterialFlag};
    use slop_sandbox::{Sandbox, Tuning};

    env_logger::init();
    log::info!("Slop Sandbox (headless) starting...");

    let json = std::env::args().any(|a| a == "--json");
    let size = Vec2::new(1280.0, 720.0);
    let mut sandbox = Sandbox::new(size, Tuning::default());

    // A cart: chassis with two welded wheels, a glass pane and a loose stack
    {
        let world = sandbox.world_mut();
        let chassis = world.insert_body(
            slop_sandbox::sim::Shape::Box { half: Vec2::new(70.0, 14.0) },
            Vec2::new(300.0, 200.0),
        );
        let left = world.spawn_circle(Vec2::new(245.0, 228.0));
        let right = world.spawn_circle(Vec2::new(355.0, 228.0));
        if let (Some(c), Some(l), Some(r)) = (chassis, left, right) {
            world.weld(c, l);
            world.weld(c, r);
            world.toggle_wheel(l);
            world.toggle_wheel(r);
            if let Some(body) = world.body_mut(c) {
                body.vel.x = 4.0;
            }
        }
        if let Some(pane) = world.spawn_box(Vec2::new(800.0, 120.0)) {
            world.toggle_material(pane, MaterialFlag::Glass);
        }
        for k in 0..3 {
            world.spawn_box(Vec2::new(1000.0, 300.0 - 60.0 * k as f32));
        }
        world.spawn_triangle(Vec2::new(640.0, 80.0));
    }
    sandbox.refresh();

    // Drive the clock as a 60 Hz host would: five seconds on land, five in water
    let mut now = 0.0f64;
    sandbox.start(now);
    let mut steps = 0u32;
    for frame in 0..600 {
        if frame == 300 {
            sandbox.handle_key(KeyCommand::SetLocation(Location::Water));
        }
        now += f64::from(SIM_DT);
        steps += sandbox.tick(now);
    }
    sandbox.stop();

    let snapshot = sandbox.snapshot();
    log::info!(
        "Ran {steps} steps: {} bodies, {} droplets, {} shards",
        snapshot.bodies.len(),
        snapshot.droplets.len(),
        snapshot.shards.len()
    );
    for body in &snapshot.bodies {
        log::info!(
            "  body {} {:?} at ({:.1}, {:.1}) angle {:.2}",
            body.id,
            body.kind,
            body.pos.x,
            body.pos.y,
            body.angle
        );
    }
    if json {
        println!("{}", snapshot.to_json());
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser hosts embed the library and drive `Sandbox` from their own frame loop
}
