use crate::cash_in::CashInState;
use crate::config::{load_settings, project_paths, save_settings_atomic, Paths, Settings};
use crate::engine::{DragTarget, Effect, Engine};
use crate::geometry::Position;
use crate::input::{collect_input_nonblocking, map_event_to_action, HostAction};
use crate::model::{BackpackItem, DeltaKey, EntityId, Stat, StepEvent};
use crate::pedometer;
use crate::screen::{bar, Screen};
use crate::storage::{load_or_init_save, save_atomic, SaveFile, SAVE_VERSION};
use crate::Cli;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// Scene units; the creature tile is 210x185 and sits centred.
const STAGE_W: f32 = 400.0;
const STAGE_H: f32 = 300.0;

fn creature_home() -> Position {
    Position::new(STAGE_W / 2.0 - 105.0, STAGE_H / 2.0 - 92.0)
}

pub(crate) struct App {
    settings: Settings,
    settings_path: PathBuf,
    decay_enabled: bool,
    paths: Paths,
    engine: Engine,
    backpack: Vec<BackpackItem>,
    wallet: i64,
    selected: usize,
    screen: Screen,
    should_quit: bool,
    autosave_at: Instant,
}

impl App {
    fn init(cli: &Cli) -> anyhow::Result<Self> {
        let paths = project_paths()?;
        init_logging(&paths.log_path)?;

        let settings_path = cli
            .settings
            .clone()
            .unwrap_or_else(|| paths.settings_path.clone());
        let settings = load_settings(&settings_path);
        let decay_enabled = settings.decay.enabled || cli.decay;

        let save = if cli.fresh {
            SaveFile::new_game()
        } else {
            load_or_init_save(&paths.save_path)
        };
        info!(
            last_seen = %save.last_seen_utc,
            steps = save.steps,
            "loaded pet"
        );

        let mut engine = Engine::new(settings.engine_config(), save.stats, save.steps);
        engine.mount(creature_home(), &save.backpack)?;

        let screen = Screen::begin()?;

        Ok(Self {
            settings,
            settings_path,
            decay_enabled,
            paths,
            engine,
            backpack: save.backpack,
            wallet: save.wallet,
            selected: 0,
            screen,
            should_quit: false,
            autosave_at: Instant::now() + Duration::from_secs(10),
        })
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        let (tx, mut steps_rx) = mpsc::channel::<String>(32);
        if let Some(token) = self.engine.subscription_token() {
            let _sensor = pedometer::spawn(
                tx,
                Duration::from_millis(self.settings.pedometer_interval_ms.max(10)),
                self.settings.seed,
                token,
            );
        }

        let fps = self.settings.fps_cap.clamp(10, 240);
        let mut frame = tokio::time::interval(Duration::from_secs_f32(1.0 / fps as f32));
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut decay = self.decay_enabled.then(|| {
            let every = Duration::from_millis(self.settings.decay.interval_ms.max(1));
            tokio::time::interval_at(tokio::time::Instant::now() + every, every)
        });

        let mut last_frame = Instant::now();

        while !self.should_quit && self.engine.is_mounted() {
            tokio::select! {
                _ = frame.tick() => {
                    let confirming = matches!(self.engine.cash_in_state(), CashInState::Confirming(_));
                    for ev in collect_input_nonblocking()? {
                        if let Some(action) = map_event_to_action(confirming, ev) {
                            self.handle(action);
                        }
                    }

                    let now = Instant::now();
                    self.engine.advance(now.saturating_duration_since(last_frame));
                    last_frame = now;
                    self.apply_effects();

                    self.render()?;

                    if Instant::now() >= self.autosave_at {
                        self.save_now()?;
                        self.autosave_at = Instant::now() + Duration::from_secs(10);
                    }
                }
                Some(raw) = steps_rx.recv() => {
                    self.engine.on_step_event(StepEvent::from_json(&raw));
                    self.apply_effects();
                }
                _ = next_decay(&mut decay) => {
                    self.engine.decay_tick(&self.settings.decay);
                    self.apply_effects();
                }
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        // Deltas still on display are owed to the pet; save before they are
        // discarded by the unmount.
        self.save_now()?;
        info!(
            pending = self.engine.pending_reconciles(),
            "cancelling pending reconciliations"
        );
        self.engine.unmount();
        self.screen.end()?;
        save_settings_atomic(&self.settings_path, &self.settings)?;
        info!("bye");
        Ok(())
    }

    fn selection(&self) -> DragTarget {
        match self.selected {
            0 => DragTarget::Creature,
            i => self
                .engine
                .placed_items()
                .get(i - 1)
                .map(|item| DragTarget::Item(item.id.clone()))
                .unwrap_or(DragTarget::Creature),
        }
    }

    fn handle(&mut self, action: HostAction) {
        match action {
            HostAction::CycleSelection => {
                if self.engine.dragging().is_none() {
                    self.selected = (self.selected + 1) % (self.engine.placed_items().len() + 1);
                }
            }
            HostAction::ToggleDrag => match self.engine.dragging().cloned() {
                Some(target) => {
                    self.engine.end_drag();
                    if let DragTarget::Item(id) = target {
                        self.remember_drop(&id);
                    }
                }
                None => {
                    let target = self.selection();
                    self.engine.begin_drag(target);
                }
            },
            HostAction::Nudge(dx, dy) => {
                if let Some(target) = self.engine.dragging() {
                    let id = target.entity();
                    if let Some(at) = self.engine.position_of(&id) {
                        self.engine.move_entity(&id, at.offset(dx, dy));
                    }
                }
            }
            HostAction::PlaceNextItem => self.place_next_item(),
            HostAction::OpenCashIn => self.engine.open_cash_in(),
            HostAction::AcceptCashIn => self.engine.accept_cash_in(),
            HostAction::DeclineCashIn => self.engine.decline_cash_in(),
            HostAction::Quit => self.should_quit = true,
        }
    }

    /// Items dropped away from the pet stay where they were left.
    fn remember_drop(&mut self, id: &str) {
        let Some(at) = self.engine.position_of(&EntityId::Item(id.to_string())) else {
            return;
        };
        if let Some(item) = self.backpack.iter_mut().find(|i| i.id == id) {
            item.location = Some(at);
        }
    }

    fn place_next_item(&mut self) {
        let placed = self.backpack.iter().filter(|i| i.is_placed()).count();
        let Some(item) = self.backpack.iter_mut().find(|i| !i.is_placed()) else {
            return;
        };
        item.location = Some(Position::new(20.0 + 50.0 * placed as f32, STAGE_H - 40.0));
        debug!(id = %item.id, "item taken out of the backpack");
        self.engine.set_backpack(&self.backpack);
    }

    /// Mirrors engine effects into the state the host owns.
    fn apply_effects(&mut self) {
        for effect in self.engine.drain_effects() {
            match effect {
                Effect::ConsumeItem(item) => {
                    self.backpack.retain(|i| i.id != item.id);
                    self.engine.set_backpack(&self.backpack);
                    self.selected = self.selected.min(self.engine.placed_items().len());
                }
                Effect::CashInSteps(snapshot) => {
                    self.wallet += i64::from(snapshot.paw_points);
                }
                Effect::ResetChangeStats { key, stats } => {
                    debug!(%key, ?stats, "change stats reset");
                }
                Effect::UpdateStepCount(value) => debug!(value, "step count"),
                Effect::UpdateWellbeingStats(delta) => debug!(?delta, "wellbeing decayed"),
            }
        }
    }

    fn render(&mut self) -> anyhow::Result<()> {
        let lines = status_lines(&self.engine, &self.backpack, self.wallet, self.selected);
        self.screen.present(&lines)
    }

    fn save_now(&self) -> anyhow::Result<()> {
        let save = SaveFile {
            version: SAVE_VERSION,
            last_seen_utc: chrono::Utc::now(),
            stats: self.engine.display_stats(),
            steps: self.engine.steps(),
            wallet: self.wallet,
            backpack: self.backpack.clone(),
        };
        save_atomic(&self.paths.save_path, &save)
    }
}

async fn next_decay(decay: &mut Option<Interval>) {
    match decay {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn status_lines(engine: &Engine, backpack: &[BackpackItem], wallet: i64, selected: usize) -> Vec<String> {
    let shown = engine.display_stats();
    let base = engine.canonical_stats();
    let anim = engine.animation();

    let mut lines = vec![
        format!(
            "PawPet  |  {:?} (row {})  |  {}",
            anim,
            anim.sprite_row(),
            match engine.dragging() {
                Some(DragTarget::Creature) => "dragging pet".to_string(),
                Some(DragTarget::Item(id)) => format!("dragging {id}"),
                None => "idle hands".to_string(),
            }
        ),
        String::new(),
    ];

    for stat in [Stat::Mood, Stat::Hunger, Stat::Health] {
        let v = shown.get(stat);
        let change = v - base.get(stat);
        let change = if change == 0 {
            String::new()
        } else {
            format!("({change:+})")
        };
        lines.push(format!("{:<8} {} {:>4} {change}", stat.label(), bar(v, 20), v));
    }
    let points = match engine.pending_delta(&DeltaKey::CashIn) {
        Some(reset) => format!(
            "{} ({:+} cashing in)",
            shown.paw_points,
            reset.get(Stat::PawPoints)
        ),
        None => shown.paw_points.to_string(),
    };
    lines.push(format!(
        "Paw points: {points}   Steps: {}   Wallet: {wallet}",
        engine.steps()
    ));
    if engine.outstanding_deltas() > 0 {
        lines.push(format!("{} change(s) settling", engine.outstanding_deltas()));
    }
    lines.push(String::new());

    let marker = |i: usize| if i == selected { '>' } else { ' ' };
    if let Some(at) = engine.position_of(&EntityId::Creature) {
        lines.push(format!("{} pet @ ({:.0}, {:.0})", marker(0), at.left, at.top));
    }
    for (i, item) in engine.placed_items().iter().enumerate() {
        let at = engine.position_of(&item.entity());
        let at = at
            .map(|p| format!("({:.0}, {:.0})", p.left, p.top))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!("{} {} [{}] @ {at}", marker(i + 1), item.id, item.key));
    }
    let stored = backpack.iter().filter(|i| !i.is_placed()).count();
    lines.push(format!("  {stored} item(s) in the backpack"));
    lines.push(String::new());

    match engine.cash_in_state() {
        CashInState::Confirming(s) => lines.push(format!(
            "Cash in {} steps for {} paw points?  y accept | n decline",
            s.steps, s.paw_points
        )),
        CashInState::Hidden => lines.push(
            "tab select | space drag/drop | arrows move | b take out item | c cash in | q quit"
                .to_string(),
        ),
    }
    lines
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pawpet=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

pub(crate) async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = App::init(&cli)?;
    let result = app.run().await;
    app.shutdown()?;
    result
}
