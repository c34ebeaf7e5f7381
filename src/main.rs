//! Melon Merge entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, KeyboardEvent, MouseEvent,
        TouchEvent,
    };

    use melon_merge::audio::WebAudioSink;
    use melon_merge::effects::Particle;
    use melon_merge::ladder::{chart_height, chart_slots};
    use melon_merge::sim::{ArenaPhysics, Engine, FrameSnapshot};
    use melon_merge::{FRUITS, FruitKind, Tuning};

    /// Game instance holding all state
    struct Game {
        engine: Engine<ArenaPhysics>,
        ctx: CanvasRenderingContext2d,
        canvas: HtmlCanvasElement,
        sprites: Vec<HtmlImageElement>,
        /// Canvas pixels per arena unit
        scale: f64,
        /// First gesture already asked for audio
        audio_requested: bool,
        particles_on: bool,
        last_score: u64,
        was_over: bool,
    }

    impl Game {
        fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d, seed: u64) -> Self {
            let engine = Engine::with_arena(Tuning::default(), seed);
            let sprites = FRUITS
                .iter()
                .filter_map(|kind| {
                    let img = HtmlImageElement::new().ok()?;
                    img.set_src(kind.sprite);
                    Some(img)
                })
                .collect();
            let mut game = Self {
                engine,
                ctx,
                canvas,
                sprites,
                scale: 1.0,
                audio_requested: false,
                particles_on: true,
                last_score: 0,
                was_over: false,
            };
            game.resize();
            game
        }

        /// Match the canvas backing store to its CSS size. The evolution
        /// chart sits below the arena.
        fn resize(&mut self) {
            let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
            let client_w = self.canvas.client_width().max(1) as f64;
            let arena = self.engine.tuning();
            let aspect = ((arena.arena_height + chart_height()) / arena.arena_width) as f64;

            let width = (client_w * dpr) as u32;
            let height = (client_w * aspect * dpr) as u32;
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            self.scale = width as f64 / arena.arena_width as f64;
        }

        /// Client coordinates to arena coordinates
        fn to_arena(&self, client_x: f64, client_y: f64) -> Vec2 {
            let rect = self.canvas.get_bounding_client_rect();
            let k = self.engine.tuning().arena_width as f64 / rect.width().max(1.0);
            Vec2::new(
                ((client_x - rect.left()) * k) as f32,
                ((client_y - rect.top()) * k) as f32,
            )
        }

        fn aim(&mut self, client_x: f64, client_y: f64) {
            let p = self.to_arena(client_x, client_y);
            self.engine.set_aim_x(p.x);
        }

        fn release(&mut self, client_x: f64, client_y: f64) {
            let p = self.to_arena(client_x, client_y);
            self.engine.set_aim_x(p.x);
            if let Err(why) = self.engine.request_drop_at(p) {
                log::trace!("Drop ignored: {why}");
            }
        }

        fn restart(&mut self) {
            self.engine.reset();
            self.last_score = 0;
            self.was_over = false;
        }

        /// One display frame
        fn update(&mut self) {
            self.engine.frame();
            for event in self.engine.take_events() {
                log::trace!("{event:?}");
            }
        }

        fn render(&self) {
            let s = self.scale;
            let ctx = &self.ctx;
            let snapshot = self.engine.snapshot();
            let tuning = self.engine.tuning();
            let w = tuning.arena_width as f64 * s;
            let h = tuning.arena_height as f64 * s;

            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str("#fdf6e3");
            ctx.fill_rect(0.0, 0.0, w, h);

            // Game-over line
            ctx.set_stroke_style_str("#ef4444");
            ctx.set_line_width(2.0 * s);
            let dash = js_sys::Array::of2(&(6.0 * s).into(), &(6.0 * s).into());
            let _ = ctx.set_line_dash(&dash);
            ctx.begin_path();
            ctx.move_to(0.0, tuning.ceiling_y as f64 * s);
            ctx.line_to(w, tuning.ceiling_y as f64 * s);
            ctx.stroke();

            if snapshot.show_drop_line {
                self.draw_drop_guide(snapshot, h);
            }
            let _ = ctx.set_line_dash(&js_sys::Array::new());

            for fruit in &snapshot.fruits {
                self.draw_fruit(fruit.pos, fruit.rank, 1.0);
            }
            for particle in &snapshot.particles {
                self.draw_particle(particle);
            }
            ctx.set_global_alpha(1.0);

            self.draw_chart(w, h);
            self.draw_hud(snapshot, w, h);
        }

        /// Every fruit in rank order with its name
        fn draw_chart(&self, w: f64, h: f64) {
            let s = self.scale;
            let ctx = &self.ctx;
            ctx.set_fill_style_str("#f3e8c8");
            ctx.fill_rect(0.0, h, w, chart_height() as f64 * s);

            ctx.set_text_align("center");
            ctx.set_font(&format!("{}px sans-serif", (9.0 * s) as u32));
            for (rank, center) in chart_slots(w as f32 / s as f32, h as f32 / s as f32) {
                let (x, y) = (center.x as f64 * s, center.y as f64 * s);
                let r = (6.0 + rank as f64) * s;
                self.draw_disc(x, y - 5.0 * s, r, rank);
                ctx.set_fill_style_str("#1f2937");
                let _ = ctx.fill_text(FruitKind::of(rank).name, x, y + 16.0 * s);
            }
        }

        fn draw_drop_guide(&self, snapshot: &FrameSnapshot, h: f64) {
            let s = self.scale;
            let x = snapshot.aim_x as f64 * s;
            let ctx = &self.ctx;
            ctx.set_stroke_style_str("rgba(0, 0, 0, 0.25)");
            ctx.set_line_width(1.0 * s);
            ctx.begin_path();
            ctx.move_to(x, 0.0);
            ctx.line_to(x, h);
            ctx.stroke();

            let pos = Vec2::new(snapshot.aim_x, self.engine.tuning().drop_y);
            self.draw_fruit(pos, snapshot.next_rank, 0.6);
        }

        fn draw_fruit(&self, pos: Vec2, rank: u8, alpha: f64) {
            let s = self.scale;
            let r = FruitKind::of(rank).radius as f64 * s;
            self.ctx.set_global_alpha(alpha);
            self.draw_disc(pos.x as f64 * s, pos.y as f64 * s, r, rank);
            self.ctx.set_global_alpha(1.0);
        }

        /// Sprite if loaded, else a solid circle in the fruit colour
        fn draw_disc(&self, x: f64, y: f64, r: f64, rank: u8) {
            let ctx = &self.ctx;
            match self.sprites.get(rank as usize) {
                Some(img) if img.complete() && img.natural_width() > 0 => {
                    let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        img,
                        x - r,
                        y - r,
                        2.0 * r,
                        2.0 * r,
                    );
                }
                _ => {
                    ctx.set_fill_style_str(FruitKind::of(rank).color);
                    ctx.begin_path();
                    let _ = ctx.arc(x, y, r, 0.0, TAU);
                    ctx.fill();
                }
            }
        }

        fn draw_particle(&self, p: &Particle) {
            let s = self.scale;
            let ctx = &self.ctx;
            ctx.set_global_alpha(p.alpha() as f64);
            ctx.set_fill_style_str(p.color);
            ctx.begin_path();
            let _ = ctx.arc(
                p.pos.x as f64 * s,
                p.pos.y as f64 * s,
                (p.size as f64 * 0.5 * s).max(0.5),
                0.0,
                TAU,
            );
            ctx.fill();
        }

        fn draw_hud(&self, snapshot: &FrameSnapshot, w: f64, h: f64) {
            let s = self.scale;
            let ctx = &self.ctx;
            ctx.set_fill_style_str("#1f2937");
            ctx.set_font(&format!("bold {}px sans-serif", (18.0 * s) as u32));
            ctx.set_text_align("left");
            let _ = ctx.fill_text(&format!("Score {}", snapshot.score), 10.0 * s, 28.0 * s);
            ctx.set_text_align("right");
            let next = FruitKind::of(snapshot.next_rank).name;
            let _ = ctx.fill_text(&format!("Next: {next}"), w - 10.0 * s, 28.0 * s);

            if !snapshot.audio_enabled && !self.audio_requested {
                ctx.set_font(&format!("{}px sans-serif", (12.0 * s) as u32));
                ctx.set_text_align("center");
                let _ = ctx.fill_text("Tap to enable sound", w / 2.0, h - 10.0 * s);
            }

            if snapshot.is_game_over {
                ctx.set_fill_style_str("rgba(0, 0, 0, 0.55)");
                ctx.fill_rect(0.0, 0.0, w, h);
                ctx.set_fill_style_str("#ffffff");
                ctx.set_text_align("center");
                ctx.set_font(&format!("bold {}px sans-serif", (32.0 * s) as u32));
                let _ = ctx.fill_text("Game Over", w / 2.0, h / 2.0 - 10.0 * s);
                ctx.set_font(&format!("{}px sans-serif", (18.0 * s) as u32));
                let _ = ctx.fill_text(
                    &format!("Score {} - press R to restart", snapshot.score),
                    w / 2.0,
                    h / 2.0 + 24.0 * s,
                );
            }
        }

        /// Mirror score and game over into the DOM, if the page has a HUD
        fn update_hud(&mut self) {
            let snapshot = self.engine.snapshot();
            if snapshot.score == self.last_score && snapshot.is_game_over == self.was_over {
                return;
            }
            self.last_score = snapshot.score;
            self.was_over = snapshot.is_game_over;

            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(el) = document.get_element_by_id("hud-score") {
                el.set_text_content(Some(&snapshot.score.to_string()));
            }
            if let Some(el) = document.get_element_by_id("game-over") {
                let class = if snapshot.is_game_over { "" } else { "hidden" };
                let _ = el.set_attribute("class", class);
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("logger init failed: {e}").into());
        }

        log::info!("Melon Merge starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document");
            return;
        };
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No <canvas id=\"canvas\"> on the page");
            return;
        };
        let ctx = match canvas.get_context("2d") {
            Ok(Some(ctx)) => match ctx.dyn_into::<CanvasRenderingContext2d>() {
                Ok(ctx) => ctx,
                Err(_) => {
                    log::error!("2d context has an unexpected type");
                    return;
                }
            },
            _ => {
                log::error!("Canvas 2d context unavailable");
                return;
            }
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(canvas.clone(), ctx, seed)));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(&canvas, game.clone());
        setup_restart_button(game.clone());
        request_animation_frame(game);

        log::info!("Melon Merge running!");
    }

    /// Start Web Audio on the first user gesture. Later gestures do nothing.
    fn unlock_audio(game: &Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            if g.audio_requested {
                return;
            }
            g.audio_requested = true;
        }
        let game = game.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match WebAudioSink::start().await {
                Ok(sink) => game.borrow_mut().engine.enable_audio(Box::new(sink)),
                Err(e) => log::warn!("{e}"),
            }
        });
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse move - aim
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                game.borrow_mut()
                    .aim(event.client_x() as f64, event.client_y() as f64);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse up - drop
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                unlock_audio(&game);
                game.borrow_mut()
                    .release(event.client_x() as f64, event.client_y() as f64);
            });
            let _ = canvas
                .add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start / move - aim
        for name in ["touchstart", "touchmove"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    game.borrow_mut()
                        .aim(touch.client_x() as f64, touch.client_y() as f64);
                }
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch end - drop where the finger left
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                unlock_audio(&game);
                if let Some(touch) = event.changed_touches().get(0) {
                    game.borrow_mut()
                        .release(touch.client_x() as f64, touch.client_y() as f64);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        if let Some(window) = web_sys::window() {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                match event.key().as_str() {
                    "r" | "R" => game.borrow_mut().restart(),
                    "m" | "M" => {
                        let mut g = game.borrow_mut();
                        let muted = !g.engine.audio_mut().is_muted();
                        g.engine.audio_mut().set_muted(muted);
                        log::info!("Muted: {muted}");
                    }
                    "p" | "P" => {
                        let mut g = game.borrow_mut();
                        g.particles_on = !g.particles_on;
                        let on = g.particles_on;
                        g.engine.set_particles_enabled(on);
                        log::info!("Particles: {on}");
                    }
                    "-" | "+" | "=" => {
                        let mut g = game.borrow_mut();
                        let step = if event.key() == "-" { -0.1 } else { 0.1 };
                        let volume = g.engine.audio_mut().volume() + step;
                        g.engine.audio_mut().set_volume(volume);
                        log::info!("Volume: {:.1}", g.engine.audio_mut().volume());
                    }
                    " " | "Enter" => {
                        unlock_audio(&game);
                        let _ = game.borrow_mut().engine.request_drop();
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Resize
        if let Some(window) = web_sys::window() {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().resize();
            });
            let _ = window
                .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |_time: f64| {
            game_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>) {
        {
            let mut g = game.borrow_mut();
            g.update();
            g.render();
            g.update_hud();
        }

        request_animation_frame(game);
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().restart();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Melon Merge (native) starting...");
    log::info!("Native mode runs a headless demo - build for wasm32 to play");

    let tuning = load_tuning(std::env::args().nth(1));
    autoplay(tuning, 42);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Tuning from a JSON file, or the defaults
#[cfg(not(target_arch = "wasm32"))]
fn load_tuning(path: Option<String>) -> melon_merge::Tuning {
    use melon_merge::Tuning;

    let Some(path) = path else {
        return Tuning::default();
    };
    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|json| Tuning::from_json(&json).map_err(|e| e.to_string()));
    match parsed {
        Ok(tuning) => {
            log::info!("Loaded tuning from {path}");
            tuning
        }
        Err(e) => {
            log::warn!("Could not load tuning from {path}: {e}; using defaults");
            Tuning::default()
        }
    }
}

/// Drop fruit across the arena until the run ends
#[cfg(not(target_arch = "wasm32"))]
fn autoplay(tuning: melon_merge::Tuning, seed: u64) {
    use melon_merge::FruitKind;
    use melon_merge::sim::{Engine, GameEvent};

    const MAX_FRAMES: u64 = 60 * 60 * 20;
    let lanes = [0.2f32, 0.5, 0.8, 0.35, 0.65];

    let mut engine = Engine::with_arena(tuning, seed);
    let width = engine.tuning().arena_width;
    let mut drops = 0usize;

    while engine.state().frame < MAX_FRAMES && !engine.state().is_game_over() {
        if !engine.state().drop_in_flight {
            engine.set_aim_x(width * lanes[drops % lanes.len()]);
            if engine.request_drop().is_ok() {
                drops += 1;
            }
        }
        engine.frame();

        for event in engine.take_events() {
            match event {
                GameEvent::Merged { rank, points, .. } => {
                    log::info!("Merged into {} (+{points})", FruitKind::of(rank).name)
                }
                GameEvent::GameOver { score } => log::info!("Game over with score {score}"),
                _ => {}
            }
        }
    }

    let state = engine.state();
    println!(
        "{} drops, {} frames, score {}, largest fruit {}",
        drops,
        state.frame,
        state.score,
        FruitKind::of(state.highest_rank).name
    );
}
