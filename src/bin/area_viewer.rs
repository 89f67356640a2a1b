use anyhow::{bail, Context, Result};
use macroquad::prelude::*;
use ::rand::rngs::StdRng;
use ::rand::SeedableRng;
use tile_area::render::{visible_cells, MacroquadBackend};
use tile_area::{
    Area, AssetPath, Body, EngineConfig, FsNodeSource, PhysicsEngine, PhysicsProperties,
    WorldContext, WorldObject,
};

const WALK_SPEED: f32 = 6.0;
const JUMP_SPEED: f32 = 14.0;
// Longest frame fed to the fixed-step loop, seconds.
const MAX_FRAME: f32 = 0.25;

fn window_conf() -> Conf {
    Conf {
        window_title: "Area Viewer".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

struct Viewer {
    config: EngineConfig,
    nodes: FsNodeSource,
    backend: MacroquadBackend,
    area: Area,
    ctx: WorldContext,
    engine: PhysicsEngine,
    actor: WorldObject,
    grounded: bool,
}

impl Viewer {
    fn open(config: EngineConfig, area_path: &str) -> Result<Self> {
        let nodes = FsNodeSource::new(&config.assets.local_root, &config.assets.resource_root);
        let mut backend =
            MacroquadBackend::new(&config.assets.local_root, &config.assets.resource_root);
        let area = load(&nodes, &mut backend, area_path)?;
        let ctx = area.world_context();
        let spawn = vec2(1.5, area.height as f32 - 0.5);
        let actor = WorldObject::new(Body::new(spawn, vec2(0.8, 0.8)))
            .with_physics(PhysicsProperties::default());

        Ok(Self {
            engine: PhysicsEngine::from_config(&config.physics),
            config,
            nodes,
            backend,
            area,
            ctx,
            actor,
            grounded: false,
        })
    }

    fn enter_gate(&mut self) -> Result<()> {
        let Some(gate) = self.area.gate_at(self.actor.body.position).cloned() else {
            return Ok(());
        };
        log::info!("entering {} at {}", gate.area, gate.entry);
        let next = load(&self.nodes, &mut self.backend, &gate.area)?;
        let previous = std::mem::replace(&mut self.area, next);
        previous.unload(&mut self.backend);

        self.ctx.set_block_grid(self.area.block_grid().clone());
        self.ctx.set_slope_grid(self.area.slopes.clone());
        self.actor.body.position = gate.entry.as_vec2() + Vec2::splat(0.5);
        self.actor.body.velocity = Vec2::ZERO;
        Ok(())
    }

    fn input(&mut self) -> Result<()> {
        let mut dir = 0.0;
        if is_key_down(KeyCode::Left) || is_key_down(KeyCode::A) {
            dir -= 1.0;
        }
        if is_key_down(KeyCode::Right) || is_key_down(KeyCode::D) {
            dir += 1.0;
        }
        self.actor.body.velocity.x = dir * WALK_SPEED;

        if self.grounded && (is_key_pressed(KeyCode::Space) || is_key_pressed(KeyCode::W)) {
            self.actor.body.velocity.y = JUMP_SPEED;
        }
        if is_key_pressed(KeyCode::Up) {
            self.enter_gate()?;
        }
        Ok(())
    }

    fn update(&mut self, dt: f32) {
        self.engine
            .step(&self.ctx, &mut self.actor, &[], dt, &mut |_| {});
        self.grounded = self.engine.something_under(
            &self.ctx,
            &self.actor,
            &[],
            self.config.physics.ground_precision,
        );
    }

    fn draw(&mut self) {
        clear_background(Color::new(0.08, 0.08, 0.12, 1.0));

        let tile = self.config.tile_size.max(1) as f32;
        let view = vec2(screen_width() / tile, screen_height() / tile);
        let target = self.actor.body.position;
        set_camera(&MacroquadBackend::camera(target, view));

        self.backend.time = get_time();
        self.area.draw(&mut self.backend, visible_cells(target, view));

        let body = &self.actor.body;
        let corner = body.position - body.size * 0.5;
        draw_rectangle(corner.x, corner.y, body.size.x, body.size.y, ORANGE);

        set_default_camera();
        draw_text(
            &format!(
                "{}  {}x{}  FPS: {}  issues: {}",
                self.area.name,
                self.area.width,
                self.area.height,
                get_fps(),
                self.area.report.issues().len()
            ),
            10.0,
            24.0,
            24.0,
            WHITE,
        );
    }
}

fn load(nodes: &FsNodeSource, backend: &mut MacroquadBackend, path: &str) -> Result<Area> {
    let location = AssetPath::local(path);
    Area::load(&location, nodes, backend, StdRng::from_entropy())
        .with_context(|| format!("Loading area {location}"))
}

async fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let [_, config_path, area_path] = args.as_slice() else {
        bail!("usage: area_viewer <engine-config.json> <area-node-path>");
    };
    let config = EngineConfig::load(config_path)?;
    let step = config.physics.fixed_step.max(1e-4);
    let mut viewer = Viewer::open(config, area_path)?;

    let mut accumulator = 0.0;
    loop {
        if is_key_pressed(KeyCode::Escape) {
            return Ok(());
        }
        viewer.input()?;

        accumulator += get_frame_time().min(MAX_FRAME);
        while accumulator >= step {
            viewer.update(step);
            accumulator -= step;
        }

        viewer.draw();
        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run().await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
