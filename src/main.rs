//! March of Pixels entry point
//!
//! The browser build wires the simulation to the DOM, Web Audio and the
//! leaderboard API. The native build plays a headless demo run.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use glam::Vec3;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlInputElement, KeyboardEvent, MouseEvent, TouchEvent};

    use march_of_pixels::audio::AudioManager;
    use march_of_pixels::hooks::{Hooks, HudState, RunSummary, SceneSink, StateSink};
    use march_of_pixels::leaderboard::{
        DEFAULT_SCORE_LIMIT, LeaderboardClient, SubmitOutcome, country_flag, sanitize_name,
    };
    use march_of_pixels::sim::{EntityId, EntityKind, Game, Phase};
    use march_of_pixels::upgrades::UpgradeKind;
    use march_of_pixels::{Lane, Progress, Settings, Tuning};

    type Shared<T> = Rc<RefCell<T>>;

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(id: &str, visible: bool) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            let classes = el.class_list();
            let _ = if visible {
                classes.remove_1("hidden")
            } else {
                classes.add_1("hidden")
            };
        }
    }

    /// Same clock as the requestAnimationFrame timestamp
    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn screen_width() -> f32 {
        web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0) as f32
    }

    fn on_click(id: &str, mut handler: impl FnMut() + 'static) {
        let Some(el) = document().and_then(|d| d.get_element_by_id(id)) else {
            log::warn!("Missing #{id}, button not wired");
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| handler());
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Tracks what the renderer would be drawing
    #[derive(Default)]
    struct SceneMirror {
        live: HashMap<(EntityKind, EntityId), Vec3>,
    }

    impl SceneSink for SceneMirror {
        fn add_entity(&mut self, kind: EntityKind, id: EntityId, pos: Vec3) {
            self.live.insert((kind, id), pos);
        }

        fn remove_entity(&mut self, kind: EntityKind, id: EntityId) {
            if self.live.remove(&(kind, id)).is_none() {
                log::debug!("Scene removal of unknown {kind:?} {id}");
            }
        }
    }

    /// HUD, game over screen and leaderboard status
    struct DomState {
        progress: Shared<Progress>,
        client: LeaderboardClient,
    }

    impl StateSink for DomState {
        fn hud(&mut self, hud: &HudState) {
            set_text("strength", &hud.strength.to_string());
            set_text("score", &format!("Score: {}", hud.score));
            set_text("coins", &hud.coins.to_string());
            set_text("distance", &format!("{}m", hud.distance.floor()));
            set_text("fire-rate", &format!("{:.2}x", hud.fire_rate_multiplier));
            if let Some(bar) = document().and_then(|d| d.get_element_by_id("progress-bar")) {
                let _ = bar.set_attribute("style", &format!("width: {}%", hud.progress * 100.0));
            }
        }

        fn game_over(&mut self, summary: &RunSummary) {
            {
                let mut progress = self.progress.borrow_mut();
                progress.deposit(summary.coins);
                progress.save();
            }
            render_upgrades(&self.progress.borrow());

            set_visible("hud", false);
            set_visible("game-over-screen", true);
            set_text("final-score", &format!("Score: {}", summary.score));
            set_text("final-strength", &summary.strength.to_string());
            set_text("final-coins", &format!("+{}", summary.coins));
            set_text("final-distance", &format!("{}m", summary.distance.floor()));
            set_text("name-error", "");
            set_text("submit-status", "");
            set_visible("name-input-modal", summary.score > 0);

            let client = self.client.clone();
            let score = summary.score;
            wasm_bindgen_futures::spawn_local(async move {
                match client.fetch_rank(score).await {
                    Ok(rank) => set_text("projected-rank", &format!("Rank #{rank}")),
                    Err(err) => log::warn!("Rank lookup failed: {err}"),
                }
            });
        }

        fn score_submitted(&mut self, outcome: &SubmitOutcome) {
            let status = match outcome {
                SubmitOutcome::Ranked(rank) => format!("Submitted! Rank #{rank}"),
                SubmitOutcome::Accepted => "Submitted!".to_string(),
                SubmitOutcome::Failed(reason) => reason.clone(),
            };
            set_text("submit-status", &status);
            if !matches!(outcome, SubmitOutcome::Failed(_)) {
                set_visible("name-input-modal", false);
            }
        }
    }

    fn upgrade_button_id(kind: UpgradeKind) -> String {
        format!("buy-{}", kind.def().name.to_lowercase().replace(' ', "-"))
    }

    /// Refresh every upgrade row and the wallet
    fn render_upgrades(progress: &Progress) {
        set_text("upgrade-coins", &progress.coins.to_string());
        for kind in UpgradeKind::ALL {
            let def = kind.def();
            let cost = match progress.cost(kind) {
                Some(cost) => format!("{cost} coins"),
                None => "MAX".to_string(),
            };
            let text = format!(
                "{} Lv {} ({}) - {}",
                def.name,
                progress.level(kind),
                kind.format_value(progress.value(kind)),
                cost
            );
            let id = upgrade_button_id(kind);
            if let Some(el) = document().and_then(|d| d.get_element_by_id(&id)) {
                el.set_text_content(Some(&text));
                let _ = if progress.can_afford(kind) {
                    el.remove_attribute("disabled")
                } else {
                    el.set_attribute("disabled", "")
                };
            }
        }
    }

    /// One button per upgrade under #upgrade-list
    fn build_upgrade_menu(progress: Shared<Progress>) {
        let Some(doc) = document() else { return };
        let Some(list) = doc.get_element_by_id("upgrade-list") else {
            log::warn!("Missing #upgrade-list, upgrades not shown");
            return;
        };
        for kind in UpgradeKind::ALL {
            let Ok(button) = doc.create_element("button") else {
                continue;
            };
            button.set_id(&upgrade_button_id(kind));
            let _ = button.set_attribute("title", kind.def().description);
            let _ = list.append_child(&button);

            let progress = progress.clone();
            on_click(&upgrade_button_id(kind), move || {
                let mut p = progress.borrow_mut();
                match p.purchase(kind) {
                    Ok(coins_left) => {
                        log::info!(
                            "Bought {} level {}, {coins_left} coins left",
                            kind.def().name,
                            p.level(kind)
                        );
                        p.save();
                    }
                    Err(err) => log::warn!("Purchase of {kind:?} refused: {err}"),
                }
                render_upgrades(&p);
            });
        }
        render_upgrades(&progress.borrow());
    }

    fn show_leaderboard(client: LeaderboardClient) {
        set_visible("leaderboard-screen", true);
        set_text("scores-status", "Loading...");
        wasm_bindgen_futures::spawn_local(async move {
            let rows = match client.fetch_scores(DEFAULT_SCORE_LIMIT).await {
                Ok(rows) => rows,
                Err(err) => {
                    log::warn!("Leaderboard fetch failed: {err}");
                    set_text("scores-status", "Leaderboard unavailable");
                    return;
                }
            };
            set_text("scores-status", if rows.is_empty() { "No scores yet" } else { "" });

            let Some(doc) = document() else { return };
            let Some(list) = doc.get_element_by_id("scores-list") else {
                return;
            };
            list.set_inner_html("");
            for (i, row) in rows.iter().enumerate() {
                let Ok(item) = doc.create_element("li") else {
                    continue;
                };
                item.set_text_content(Some(&format!(
                    "{}. {} {} {} ({} strength)",
                    i + 1,
                    country_flag(&row.country),
                    row.name,
                    row.score,
                    row.strength
                )));
                let _ = list.append_child(&item);
            }
        });
    }

    /// Arrow keys / A-D, plus thirds of the screen for touch and mouse drags
    fn setup_input_handlers(lane: Rc<Cell<Lane>>) {
        let Some(window) = web_sys::window() else { return };
        let held = Rc::new(Cell::new((false, false)));

        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let lane = lane.clone();
            let held = held.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let (mut left, mut right) = held.get();
                match event.code().as_str() {
                    "ArrowLeft" | "KeyA" => left = pressed,
                    "ArrowRight" | "KeyD" => right = pressed,
                    _ => return,
                }
                if pressed {
                    event.prevent_default();
                }
                held.set((left, right));
                lane.set(Lane::from_keys(left, right));
            });
            let _ = window
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let Some(container) = document().and_then(|d| d.get_element_by_id("game-container"))
        else {
            log::warn!("Missing #game-container, pointer input disabled");
            return;
        };
        let dragging = Rc::new(Cell::new(false));

        for (event_name, starts) in [("touchstart", true), ("touchmove", false)] {
            let lane = lane.clone();
            let dragging = dragging.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if starts {
                    dragging.set(true);
                }
                if !dragging.get() {
                    return;
                }
                if let Some(touch) = event.touches().get(0) {
                    lane.set(Lane::from_screen_x(touch.client_x() as f32, screen_width()));
                }
            });
            let _ = container
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        for (event_name, starts) in [("mousedown", true), ("mousemove", false)] {
            let lane = lane.clone();
            let dragging = dragging.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                if starts {
                    dragging.set(true);
                }
                if dragging.get() {
                    lane.set(Lane::from_screen_x(event.client_x() as f32, screen_width()));
                }
            });
            let _ = container
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        for event_name in ["touchend", "mouseup"] {
            let dragging = dragging.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                dragging.set(false);
            });
            let _ = container
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_mute(settings: Shared<Settings>, audio: Shared<AudioManager>) {
        let Some(window) = web_sys::window() else { return };
        for (event_name, focused) in [("blur", false), ("focus", true)] {
            let settings = settings.clone();
            let audio = audio.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if !settings.borrow().mute_on_blur {
                    return;
                }
                if focused {
                    audio.borrow().resume();
                } else {
                    audio.borrow().suspend();
                    log::info!("Audio suspended (window blur)");
                }
            });
            let _ = window
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// `data-tuning` on #game-container overrides the defaults
    fn load_tuning() -> Tuning {
        let json = document()
            .and_then(|d| d.get_element_by_id("game-container"))
            .and_then(|el| el.get_attribute("data-tuning"));
        let mut tuning = match json.as_deref().map(Tuning::from_json) {
            Some(Ok(tuning)) => tuning,
            Some(Err(err)) => {
                log::warn!("Ignoring data-tuning: {err}");
                Tuning::default()
            }
            None => Tuning::default(),
        };
        if tuning.seed == 0 {
            tuning.seed = js_sys::Date::now() as u64;
        }
        tuning
    }

    fn begin_run(game: &Shared<Game>, progress: &Shared<Progress>, audio: &Shared<AudioManager>) {
        audio.borrow().resume();
        let mut g = game.borrow_mut();
        g.set_upgrades(progress.borrow().stats());
        if g.phase == Phase::Idle {
            g.start(now());
        } else {
            g.restart(now());
        }
        set_visible("start-screen", false);
        set_visible("game-over-screen", false);
        set_visible("upgrade-screen", false);
        set_visible("hud", true);
    }

    fn setup_buttons(
        game: Shared<Game>,
        progress: Shared<Progress>,
        settings: Shared<Settings>,
        audio: Shared<AudioManager>,
        client: LeaderboardClient,
    ) {
        for id in ["start-btn", "restart-btn"] {
            let (game, progress, audio) = (game.clone(), progress.clone(), audio.clone());
            on_click(id, move || begin_run(&game, &progress, &audio));
        }

        {
            let game = game.clone();
            let progress = progress.clone();
            on_click("menu-btn", move || {
                game.borrow_mut().go_to_menu();
                render_upgrades(&progress.borrow());
                set_visible("game-over-screen", false);
                set_visible("start-screen", true);
            });
        }

        {
            let game = game.clone();
            on_click("submit-name-btn", move || {
                let name = document()
                    .and_then(|d| d.get_element_by_id("player-name-input"))
                    .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                    .map(|input| {
                        let name = sanitize_name(&input.value());
                        input.set_value(&name);
                        name
                    })
                    .unwrap_or_default();
                match game.borrow_mut().submit_score(&name) {
                    Ok(true) => {
                        set_text("name-error", "");
                        set_text("submit-status", "Submitting...");
                    }
                    Ok(false) => {}
                    Err(err) => set_text("name-error", &err.to_string()),
                }
            });
        }
        on_click("skip-name-btn", || set_visible("name-input-modal", false));

        on_click("leaderboard-btn", move || show_leaderboard(client.clone()));
        on_click("close-leaderboard-btn", || set_visible("leaderboard-screen", false));

        {
            let progress = progress.clone();
            on_click("upgrade-btn", move || {
                render_upgrades(&progress.borrow());
                set_visible("upgrade-screen", true);
            });
        }
        on_click("close-upgrade-btn", || set_visible("upgrade-screen", false));

        let label = |muted: bool| if muted { "Sound: off" } else { "Sound: on" };
        set_text("mute-btn", label(settings.borrow().muted));
        on_click("mute-btn", move || {
            let mut s = settings.borrow_mut();
            let muted = s.toggle_mute();
            s.save();
            audio.borrow_mut().apply_settings(&s);
            set_text("mute-btn", label(muted));
        });
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Logger init failed: {err}").into());
        }

        log::info!("March of Pixels starting...");

        set_visible("loading", false);

        let settings = Rc::new(RefCell::new(Settings::load()));
        let progress = Rc::new(RefCell::new(Progress::load()));
        let tuning = load_tuning();
        log::info!("Tuning: {tuning:?}");

        let lane = Rc::new(Cell::new(Lane::Center));
        let audio = Rc::new(RefCell::new(AudioManager::new(&settings.borrow())));
        let client = LeaderboardClient::default();

        let hooks = Hooks::default()
            .with_input(lane.clone())
            .with_scene(SceneMirror::default())
            .with_audio(audio.clone())
            .with_state(DomState {
                progress: progress.clone(),
                client: client.clone(),
            })
            .with_submitter(client.clone());
        let stats = progress.borrow().stats();
        let game = Rc::new(RefCell::new(Game::new(tuning, stats, hooks)));

        setup_input_handlers(lane);
        setup_auto_mute(settings.clone(), audio.clone());
        build_upgrade_menu(progress.clone());
        setup_buttons(game.clone(), progress, settings, audio, client);

        set_visible("start-screen", true);
        request_animation_frame(game);

        log::info!("March of Pixels running!");
    }

    fn request_animation_frame(game: Shared<Game>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| game_loop(game, time));
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Shared<Game>, time: f64) {
        game.borrow_mut().frame(time);
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::Cell;
    use std::rc::Rc;

    use march_of_pixels::hooks::Hooks;
    use march_of_pixels::sim::{Game, Phase};
    use march_of_pixels::{Lane, Progress, Tuning};

    /// 60 fps
    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Five minutes of play at most
    const MAX_FRAMES: u32 = 60 * 300;
    /// How far ahead the autopilot looks
    const LOOKAHEAD: f32 = 25.0;

    /// Prefer lanes with positive gates, avoid lanes with enemies
    fn choose_lane(game: &Game, current: Lane) -> Lane {
        let ahead = |z: f32| (0.0..LOOKAHEAD).contains(&z);
        let mut best = (current, i64::MIN);
        for lane in Lane::ALL {
            let enemies = game
                .spawner
                .enemies
                .iter()
                .filter(|e| ahead(e.pos.z) && Lane::nearest(e.pos.x) == lane)
                .count() as i64;
            let gates: i64 = game
                .spawner
                .gates
                .iter()
                .filter(|g| ahead(g.pos.z) && Lane::nearest(g.pos.x) == lane)
                .map(|g| g.value as i64)
                .sum();
            let mut score = gates - enemies * 100;
            if lane == current {
                score += 1;
            }
            if score > best.1 {
                best = (lane, score);
            }
        }
        best.0
    }

    pub fn run(seed: u64) {
        let lane = Rc::new(Cell::new(Lane::Center));
        let tuning = Tuning {
            seed,
            ..Tuning::default()
        };
        let mut game = Game::new(
            tuning,
            Progress::default().stats(),
            Hooks::default().with_input(lane.clone()),
        );

        let mut now = 0.0;
        game.start(now);
        for _ in 0..MAX_FRAMES {
            lane.set(choose_lane(&game, lane.get()));
            now += FRAME_MS;
            game.frame(now);
            if game.phase != Phase::Running {
                break;
            }
        }

        let summary = game.summary();
        log::info!(
            "Demo finished ({:?}): score {}, strength {}, coins {}, {:.0} m",
            game.phase,
            summary.score,
            summary.strength,
            summary.coins,
            summary.distance
        );
        println!(
            "score={} strength={} coins={} distance={:.0}m",
            summary.score, summary.strength, summary.coins, summary.distance
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("March of Pixels (native) starting...");
    log::info!("The playable build runs in the browser; playing a headless demo run");

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    demo::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
