use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Instant,
};

use crate::{
    ecology::{SpawnRule, Spawner},
    error::{panic_message, GardenError, Result},
    events::{Category, Emitter, EventSink, NullSink},
    geometry::Position,
    insect::{predate_insects, Insect},
    modules::{ControlModule, ModuleContext, PestControl, WateringSystem},
    plant::Plant,
    rng::{self, RngManager},
    sensor::{Sensor, SensorKind},
    snapshot::GardenSnapshot,
    species::{InsectKind, PlantKind},
    world::{EntityId, World},
};

pub const FERTILIZE_ALL_AMOUNT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub seed: u64,
    /// A garden status line is emitted every this many ticks.
    pub status_interval_ticks: u64,
    /// Dead insects are removed every this many ticks.
    pub cleanup_interval_ticks: u64,
    pub hunt_radius: f64,
    pub kill_chance: f64,
    pub spawning: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            status_interval_ticks: 50,
            cleanup_interval_ticks: 200,
            hunt_radius: 2.0,
            kill_chance: 0.3,
            spawning: true,
        }
    }
}

/// Called after every completed tick.
pub trait TickObserver: Send {
    fn on_tick(&mut self, summary: &TickSummary, world: &World);
}

impl<F> TickObserver for F
where
    F: FnMut(&TickSummary, &World) + Send,
{
    fn on_tick(&mut self, summary: &TickSummary, world: &World) {
        self(summary, world)
    }
}

pub struct EngineBuilder {
    world: World,
    settings: EngineSettings,
    modules: Vec<Box<dyn ControlModule>>,
    observers: Vec<Box<dyn TickObserver>>,
    sink: Arc<dyn EventSink>,
    spawner: Spawner,
}

impl EngineBuilder {
    pub fn new(world: World, settings: EngineSettings) -> Self {
        Self {
            world,
            settings,
            modules: Vec::new(),
            observers: Vec::new(),
            sink: Arc::new(NullSink),
            spawner: Spawner::default(),
        }
    }

    pub fn with_module(mut self, module: impl ControlModule + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn push_module(&mut self, module: impl ControlModule + 'static) {
        self.modules.push(Box::new(module));
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_observer(mut self, observer: impl TickObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn with_spawn_rules(mut self, rules: Vec<SpawnRule>) -> Self {
        self.spawner = Spawner::new(rules);
        self
    }

    pub fn build(self) -> Engine {
        let engine = Engine {
            rng: RngManager::new(self.settings.seed),
            world: self.world,
            modules: self.modules,
            observers: self.observers,
            sink: self.sink,
            spawner: self.spawner,
            settings: self.settings,
        };
        let bounds = engine.world.bounds();
        engine.emitter().info(
            Category::Garden,
            format!(
                "Garden '{}' created: {}x{} grid",
                engine.world.name(),
                bounds.rows,
                bounds.cols
            ),
        );
        engine
    }
}

pub struct Engine {
    world: World,
    modules: Vec<Box<dyn ControlModule>>,
    observers: Vec<Box<dyn TickObserver>>,
    rng: RngManager,
    sink: Arc<dyn EventSink>,
    spawner: Spawner,
    settings: EngineSettings,
}

impl Engine {
    /// Advances the garden by one tick.
    ///
    /// Failures of single entities, modules or orchestration stages are
    /// rolled back, reported to the event sink and listed in the summary;
    /// the tick itself always completes.
    pub fn tick(&mut self) -> TickSummary {
        let tick = self.world.advance_tick();
        let sink = Arc::clone(&self.sink);
        let events = Emitter::new(sink.as_ref(), tick);
        let mut summary = TickSummary::new(tick);

        self.run_stage("environment", &events, &mut summary, |engine| {
            let mut rng = engine.rng.stream(rng::ENVIRONMENT);
            let world = &mut engine.world;
            world.conditions = world.environment.advance(tick, &mut rng);
            Ok(())
        });

        let sensor_failures = self.run_stage("sensors", &events, &mut summary, |engine| {
            let mut rng = engine.rng.stream(rng::SENSORS);
            let world = &mut engine.world;
            Ok(world
                .sensors
                .update_all(&world.conditions, &world.plants, &mut rng, &events))
        });
        for failure in sensor_failures.unwrap_or_default() {
            report(failure, Category::Sensor, &events, &mut summary);
        }

        self.run_modules(&events, &mut summary);
        self.update_plants(&events, &mut summary);
        self.update_insects(&events, &mut summary);

        self.run_stage("predation", &events, &mut summary, |engine| {
            let mut rng = engine.rng.stream(rng::PREDATION);
            let (radius, chance) = (engine.settings.hunt_radius, engine.settings.kill_chance);
            let insects = &mut engine.world.insects;
            for hunter in 0..insects.len() {
                predate_insects(insects, hunter, radius, chance, &mut rng, &events);
            }
            Ok(())
        });

        if self.settings.spawning {
            let spawned = self.run_stage("spawning", &events, &mut summary, |engine| {
                let mut rng = engine.rng.stream(rng::SPAWNING);
                engine
                    .spawner
                    .spawn(tick, &mut engine.world, &mut rng, &events)
            });
            summary.spawned = spawned.unwrap_or_default();
        }

        if every(tick, self.settings.cleanup_interval_ticks) {
            let removed = self.run_stage("cleanup", &events, &mut summary, |engine| {
                Ok(engine.world.remove_dead_insects())
            });
            summary.removed = removed.unwrap_or(0);
        }

        if every(tick, self.settings.status_interval_ticks) {
            let line = self.status_line();
            publish(&events, &mut summary, |events| events.info(Category::Garden, line));
        }

        self.notify_observers(&events, &mut summary);
        summary
    }

    pub fn run(&mut self, ticks: u64) -> usize {
        let mut failures = 0;
        self.run_with_hook(ticks, |summary, _| failures += summary.failures.len());
        failures
    }

    pub fn run_with_hook<F>(&mut self, ticks: u64, mut hook: F)
    where
        F: FnMut(&TickSummary, &World),
    {
        for _ in 0..ticks {
            let summary = self.tick();
            hook(&summary, &self.world);
        }
    }

    // Runs one orchestration stage against a world checkpoint; on failure
    // the world is restored and `None` returned.
    fn run_stage<T, F>(
        &mut self,
        stage: &'static str,
        events: &Emitter<'_>,
        summary: &mut TickSummary,
        f: F,
    ) -> Option<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let checkpoint = self.world.clone();
        match isolate(|| f(self)) {
            Ok(value) => Some(value),
            Err(reason) => {
                self.world = checkpoint;
                let failure = GardenError::Stage {
                    tick: summary.tick,
                    stage,
                    reason,
                };
                report(failure, Category::Application, events, summary);
                None
            }
        }
    }

    fn run_modules(&mut self, events: &Emitter<'_>, summary: &mut TickSummary) {
        let ctx = ModuleContext {
            tick: summary.tick,
            events: *events,
        };
        for module in self.modules.iter_mut() {
            if !module.is_enabled() {
                continue;
            }
            let name = module.name();
            let checkpoint = self.world.clone();
            let rng = self.rng.stream(name);
            let world = &mut self.world;
            let start = Instant::now();
            let outcome = isolate(|| module.update(&ctx, world, rng));
            let duration_ms = start.elapsed().as_secs_f64() * 1_000.0;
            summary.module_reports.push(ModuleRunReport {
                name,
                duration_ms,
                succeeded: outcome.is_ok(),
            });
            if let Err(reason) = outcome {
                self.world = checkpoint;
                let failure = GardenError::ModuleUpdate {
                    module: name.to_string(),
                    reason,
                };
                report(failure, Category::Application, events, summary);
            }
        }
    }

    fn update_plants(&mut self, events: &Emitter<'_>, summary: &mut TickSummary) {
        let conditions = self.world.conditions;
        for plant in self.world.plants.iter_mut() {
            let before = plant.clone();
            if let Err(reason) = isolate(|| plant.update(&conditions, events)) {
                *plant = before;
                let failure = GardenError::EntityUpdate {
                    entity: plant.label(),
                    reason,
                };
                report(failure, Category::Plant, events, summary);
            }
        }
    }

    fn update_insects(&mut self, events: &Emitter<'_>, summary: &mut TickSummary) {
        let mut rng = self.rng.stream(rng::INSECTS);
        let bounds = self.world.bounds();
        let plants = &mut self.world.plants;
        let insects = &mut self.world.insects;
        for insect in insects.iter_mut() {
            let before = insect.clone();
            let outcome = isolate(|| {
                insect.update(plants, bounds, &mut rng, events);
                Ok::<(), GardenError>(())
            });
            if let Err(reason) = outcome {
                *insect = before;
                let failure = GardenError::EntityUpdate {
                    entity: insect.label(),
                    reason,
                };
                report(failure, Category::Insect, events, summary);
            }
        }
    }

    // Observers see the summary as it stood when they were called; their own
    // failures are appended afterwards.
    fn notify_observers(&mut self, events: &Emitter<'_>, summary: &mut TickSummary) {
        let world = &self.world;
        for observer in self.observers.iter_mut() {
            let seen: &TickSummary = summary;
            let outcome = isolate(|| {
                observer.on_tick(seen, world);
                Ok::<(), GardenError>(())
            });
            if let Err(reason) = outcome {
                let failure = GardenError::Stage {
                    tick: summary.tick,
                    stage: "observers",
                    reason,
                };
                report(failure, Category::Application, events, summary);
            }
        }
    }

    pub fn status_line(&self) -> String {
        let world = &self.world;
        let conditions = world.conditions();
        format!(
            "--- TICK {} STATUS | Temp: {:.1}°F | Light: {:.0} | Humidity: {:.0}% | Plants: {}/{} alive | Insects: {} ({} pests) ---",
            world.tick(),
            conditions.temperature,
            conditions.light,
            conditions.humidity,
            world.alive_plant_count(),
            world.plants().len(),
            world.alive_insect_count(),
            world.alive_pest_count()
        )
    }

    fn emitter(&self) -> Emitter<'_> {
        Emitter::new(self.sink.as_ref(), self.world.tick())
    }

    pub fn current_tick(&self) -> u64 {
        self.world.tick()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.sink)
    }

    pub fn add_plant(&mut self, kind: PlantKind, position: Position) -> Result<EntityId> {
        self.world.check_bounds(position)?;
        let id = self.world.next_entity_id();
        self.insert_plant(Plant::new(id, kind, position))
    }

    /// Seeds a pre-built plant, e.g. one with non-default levels.
    pub fn insert_plant(&mut self, plant: Plant) -> Result<EntityId> {
        let message = format!(
            "{} ({}) planted at {}",
            plant.label(),
            plant.species().latin_name,
            plant.position()
        );
        let id = self.world.insert_plant(plant)?;
        self.emitter().info(Category::Plant, message);
        Ok(id)
    }

    pub fn add_insect(&mut self, kind: InsectKind, position: Position) -> Result<EntityId> {
        self.world.check_bounds(position)?;
        let id = self.world.next_entity_id();
        self.insert_insect(Insect::new(id, kind, position))
    }

    pub fn insert_insect(&mut self, insect: Insect) -> Result<EntityId> {
        let message = format!(
            "{} ({}) appeared at {}",
            insect.label(),
            insect.insect_type(),
            insect.position()
        );
        let id = self.world.insert_insect(insect)?;
        self.emitter().info(Category::Insect, message);
        Ok(id)
    }

    pub fn add_sensor(&mut self, kind: SensorKind, position: Position) -> Result<EntityId> {
        self.world.check_bounds(position)?;
        let id = self.world.next_entity_id();
        let sensor = Sensor::new(id, kind, position);
        let (min, max) = sensor.thresholds();
        let message = format!(
            "{} installed at {position} (range: {min:.1}-{max:.1} {})",
            sensor.label(),
            kind.unit()
        );
        self.world.insert_sensor(sensor)?;
        self.emitter().info(Category::Sensor, message);
        Ok(id)
    }

    pub fn register_module(&mut self, module: impl ControlModule + 'static) {
        let message = format!("Module registered: {}", module.status_summary());
        self.modules.push(Box::new(module));
        self.emitter().info(Category::Garden, message);
    }

    pub fn add_observer(&mut self, observer: impl TickObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn modules(&self) -> impl Iterator<Item = &dyn ControlModule> {
        self.modules.iter().map(|m| &**m)
    }

    pub fn module<T: ControlModule + 'static>(&self) -> Option<&T> {
        self.modules
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<T>())
    }

    pub fn module_mut<T: ControlModule + 'static>(&mut self) -> Option<&mut T> {
        self.modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<T>())
    }

    pub fn set_module_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let module = self
            .modules
            .iter_mut()
            .find(|m| m.name() == name)
            .ok_or_else(|| GardenError::InvalidConfig(format!("unknown module '{name}'")))?;
        module.set_enabled(enabled);
        let state = if enabled { "ENABLED" } else { "DISABLED" };
        let message = format!("{} {state}", module.name());
        self.emitter().info(Category::UserAction, message);
        Ok(())
    }

    pub fn record_user_action(&self, message: impl Into<String>) {
        self.emitter().info(Category::UserAction, message);
    }

    pub fn manual_water(&mut self) -> Result<usize> {
        let events = Emitter::new(self.sink.as_ref(), self.world.tick());
        let watering = self
            .modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<WateringSystem>())
            .ok_or(GardenError::MissingModule("watering"))?;
        Ok(watering.manual_water(&mut self.world, &events))
    }

    pub fn manual_pest_control(&mut self) -> Result<usize> {
        let tick = self.world.tick();
        let events = Emitter::new(self.sink.as_ref(), tick);
        let pest_control = self
            .modules
            .iter_mut()
            .find_map(|m| m.as_any_mut().downcast_mut::<PestControl>())
            .ok_or(GardenError::MissingModule("pest_control"))?;
        let mut rng = self.rng.stream(pest_control.name());
        Ok(pest_control.manual_pest_control(tick, &mut self.world, &mut rng, &events))
    }

    /// Gives every living plant a dose of fertilizer. Returns how many
    /// plants were fed.
    pub fn fertilize_all(&mut self) -> usize {
        let events = Emitter::new(self.sink.as_ref(), self.world.tick());
        events.info(Category::UserAction, "Manual override: fertilizing all plants");
        let mut fed = 0;
        for plant in self.world.plants.iter_mut().filter(|p| p.is_alive()) {
            plant.fertilize(FERTILIZE_ALL_AMOUNT, &events);
            fed += 1;
        }
        fed
    }

    pub fn status_summaries(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.status_summary()).collect()
    }

    pub fn snapshot(&self) -> GardenSnapshot {
        GardenSnapshot::capture(&self.world, self.modules())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("garden", &self.world.name())
            .field("tick", &self.world.tick())
            .field("modules", &self.modules.len())
            .field("seed", &self.rng.seed())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ModuleRunReport {
    pub name: &'static str,
    pub duration_ms: f64,
    pub succeeded: bool,
}

#[derive(Clone, Debug)]
pub struct TickSummary {
    pub tick: u64,
    pub module_reports: Vec<ModuleRunReport>,
    pub failures: Vec<GardenError>,
    pub spawned: Vec<EntityId>,
    pub removed: usize,
}

impl TickSummary {
    fn new(tick: u64) -> Self {
        Self {
            tick,
            module_reports: Vec::new(),
            failures: Vec::new(),
            spawned: Vec::new(),
            removed: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn every(tick: u64, interval: u64) -> bool {
    interval > 0 && tick % interval == 0
}

/// Runs `f`, turning both returned errors and panics into a failure reason.
fn isolate<T, E, F>(f: F) -> std::result::Result<T, String>
where
    E: fmt::Display,
    F: FnOnce() -> std::result::Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(panic_message(payload)),
    }
}

fn report(failure: GardenError, category: Category, events: &Emitter<'_>, summary: &mut TickSummary) {
    tracing::warn!(tick = summary.tick, error = %failure, "isolated failure");
    let message = failure.to_string();
    summary.failures.push(failure);
    publish(events, summary, |events| events.error(category, message));
}

/// Hands an engine-level event to the sink. A sink that panics is recorded
/// in the summary and logged through `tracing` only.
fn publish<F>(events: &Emitter<'_>, summary: &mut TickSummary, emit: F)
where
    F: FnOnce(&Emitter<'_>),
{
    let outcome = isolate(|| {
        emit(events);
        Ok::<(), GardenError>(())
    });
    if let Err(reason) = outcome {
        tracing::warn!(tick = summary.tick, %reason, "event sink failed");
        summary.failures.push(GardenError::Stage {
            tick: summary.tick,
            stage: "events",
            reason,
        });
    }
}
