use crate::games::terminal::{self, paint, Notice, Rgb, TerminalGuard};
use crate::games::timer::Scheduler;
use crate::games::Scoreboard;
use crossterm::event::{Event, KeyCode, MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info};
use rand::Rng;
use std::io::Stdout;
use std::time::{Duration, Instant};

const TICK_MS: u64 = 33;
const DEFAULT_DURATION_SECS: u32 = 30;
const MIN_DURATION_SECS: u32 = 5;
const MAX_DURATION_SECS: u32 = 300;
const HIT_POINTS: u32 = 10;
const TARGET_TTL: Duration = Duration::from_secs(3);
const SWEEP_EVERY: Duration = Duration::from_millis(100);
const COUNTDOWN_EVERY: Duration = Duration::from_secs(1);
const RESPAWN_DELAY: Duration = Duration::from_millis(200);
const DOUBLE_SPAWN_CHANCE: f64 = 0.3;
// 'r' is left out so it can stay the reset key.
const LABELS: &str = "abcdefghijklmnopqstuvwxyz";

const ARENA_WIDTH: u16 = 60;
const ARENA_HEIGHT: u16 = 16;
const TARGET_WIDTH: u16 = 3;
// Screen offset of the arena's top-left cell, see draw_ui.
const ARENA_TOP: u16 = 4;
const ARENA_LEFT: u16 = 1;

const GREEN: Rgb = Rgb::new(0, 255, 0);
const YELLOW: Rgb = Rgb::new(255, 255, 0);
const ORANGE: Rgb = Rgb::new(255, 128, 0);
const RED: Rgb = Rgb::new(255, 0, 0);
const GOLD: Rgb = Rgb::new(255, 215, 0);

pub struct BashConfig
{
    duration_secs: u32,
}

impl BashConfig
{
    pub fn new(duration_secs: u32) -> Self
    {
        Self {
            duration_secs: duration_secs.clamp(MIN_DURATION_SECS, MAX_DURATION_SECS),
        }
    }
}

impl Default for BashConfig
{
    fn default() -> Self
    {
        Self::new(DEFAULT_DURATION_SECS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target
{
    pub id: u64,
    pub x: u16,
    pub y: u16,
    pub label: char,
    pub spawned_at: Instant,
}

impl Target
{
    fn covers(&self, x: u16, y: u16) -> bool
    {
        y == self.y && x >= self.x && x < self.x + TARGET_WIDTH
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BashState
{
    Ready,
    Running,
    Over,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HitResult
{
    Hit(u64),
    Miss,
    Ignored,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MatchSummary
{
    pub score: u32,
    pub hits: u32,
    pub attempts: u32,
    pub new_best: bool,
}

#[derive(Clone)]
enum TimerEvent
{
    Countdown,
    Sweep,
    Spawn(Vec<(u16, u16)>),
}

pub struct ButtonBash
{
    duration_secs: u32,
    time_left: u32,
    score: u32,
    best: u32,
    hits: u32,
    misses: u32,
    targets: Vec<Target>,
    next_id: u64,
    state: BashState,
    timers: Scheduler<TimerEvent>,
}

impl ButtonBash
{
    pub fn new(config: &BashConfig, best: u32) -> Self
    {
        Self {
            duration_secs: config.duration_secs,
            time_left: config.duration_secs,
            score: 0,
            best,
            hits: 0,
            misses: 0,
            targets: Vec::new(),
            next_id: 0,
            state: BashState::Ready,
            timers: Scheduler::new(),
        }
    }

    pub fn state(&self) -> BashState
    {
        self.state
    }

    pub fn score(&self) -> u32
    {
        self.score
    }

    pub fn best(&self) -> u32
    {
        self.best
    }

    pub fn time_left(&self) -> u32
    {
        self.time_left
    }

    pub fn targets(&self) -> &[Target]
    {
        &self.targets
    }

    pub fn hits(&self) -> u32
    {
        self.hits
    }

    pub fn attempts(&self) -> u32
    {
        self.hits + self.misses
    }

    /// Successful clicks over all clicks, as a percentage.
    pub fn accuracy(&self) -> f32
    {
        compute_accuracy(self.hits, self.attempts())
    }

    pub fn start(&mut self, now: Instant, rng: &mut impl Rng)
    {
        self.reset();
        self.state = BashState::Running;
        self.timers.every(COUNTDOWN_EVERY, now, TimerEvent::Countdown);
        self.timers.every(SWEEP_EVERY, now, TimerEvent::Sweep);
        let (x, y) = random_position(rng);
        self.add_target(x, y, now, rng);
        info!("button bash started, {}s on the clock", self.duration_secs);
    }

    pub fn reset(&mut self)
    {
        self.timers.clear();
        self.targets.clear();
        self.time_left = self.duration_secs;
        self.score = 0;
        self.hits = 0;
        self.misses = 0;
        self.state = BashState::Ready;
    }

    /// Pointer click at an arena cell.
    pub fn click_at(&mut self, x: u16, y: u16, now: Instant, rng: &mut impl Rng) -> HitResult
    {
        if self.state != BashState::Running {
            return HitResult::Ignored;
        }
        // Newest first, it is drawn on top.
        match self.targets.iter().rposition(|target| target.covers(x, y)) {
            Some(index) => self.hit(index, now, rng),
            None => self.miss(),
        }
    }

    /// Keyboard hit on the target showing `label`.
    pub fn press(&mut self, label: char, now: Instant, rng: &mut impl Rng) -> HitResult
    {
        if self.state != BashState::Running {
            return HitResult::Ignored;
        }
        let label = label.to_ascii_lowercase();
        match self.targets.iter().position(|target| target.label == label) {
            Some(index) => self.hit(index, now, rng),
            None => self.miss(),
        }
    }

    /// Fires due timers. Returns the summary when the match ended during this call.
    pub fn update(&mut self, now: Instant, rng: &mut impl Rng) -> Option<MatchSummary>
    {
        if self.timers.is_empty() {
            return None;
        }
        for event in self.timers.poll(now) {
            if self.state != BashState::Running {
                break;
            }
            match event {
                TimerEvent::Countdown => {
                    self.time_left = self.time_left.saturating_sub(1);
                    if self.time_left == 0 {
                        return Some(self.finish());
                    }
                }
                TimerEvent::Sweep => {
                    self.sweep(now);
                }
                TimerEvent::Spawn(positions) => {
                    for (x, y) in positions {
                        self.add_target(x, y, now, rng);
                    }
                }
            }
        }
        None
    }

    /// Drops every target that outlived its TTL, clicked or not.
    pub fn sweep(&mut self, now: Instant) -> usize
    {
        let before = self.targets.len();
        self.targets
            .retain(|target| now.saturating_duration_since(target.spawned_at) < TARGET_TTL);
        let expired = before - self.targets.len();
        if expired > 0 {
            debug!("{expired} target(s) expired");
        }
        expired
    }

    fn hit(&mut self, index: usize, now: Instant, rng: &mut impl Rng) -> HitResult
    {
        let target = self.targets.remove(index);
        self.score += HIT_POINTS;
        self.hits += 1;

        let count = if rng.gen_bool(DOUBLE_SPAWN_CHANCE) { 2 } else { 1 };
        let positions: Vec<(u16, u16)> = (0..count).map(|_| random_position(&mut *rng)).collect();
        self.timers.after(RESPAWN_DELAY, now, TimerEvent::Spawn(positions));
        debug!("hit target {} ({}), score {}", target.id, target.label, self.score);
        HitResult::Hit(target.id)
    }

    fn miss(&mut self) -> HitResult
    {
        self.misses += 1;
        HitResult::Miss
    }

    fn finish(&mut self) -> MatchSummary
    {
        self.timers.clear();
        self.targets.clear();
        self.state = BashState::Over;
        let new_best = self.score > self.best;
        if new_best {
            self.best = self.score;
        }
        info!(
            "button bash over: score {} hits {}/{} best {}",
            self.score,
            self.hits,
            self.attempts(),
            self.best
        );
        MatchSummary {
            score: self.score,
            hits: self.hits,
            attempts: self.attempts(),
            new_best,
        }
    }

    fn add_target(&mut self, x: u16, y: u16, now: Instant, rng: &mut impl Rng)
    {
        let free: Vec<char> = LABELS
            .chars()
            .filter(|ch| self.targets.iter().all(|target| target.label != *ch))
            .collect();
        let label = if free.is_empty() {
            // Every letter is on screen; doubling up is harmless.
            LABELS
                .chars()
                .nth(rng.gen_range(0..LABELS.len()))
                .unwrap_or('a')
        } else {
            free[rng.gen_range(0..free.len())]
        };

        self.targets.push(Target {
            id: self.next_id,
            x,
            y,
            label,
            spawned_at: now,
        });
        self.next_id += 1;
    }
}

fn random_position(rng: &mut impl Rng) -> (u16, u16)
{
    (
        rng.gen_range(0..=ARENA_WIDTH - TARGET_WIDTH),
        rng.gen_range(0..ARENA_HEIGHT),
    )
}

fn compute_accuracy(hits: u32, attempts: u32) -> f32
{
    if attempts == 0 {
        return 0.0;
    }
    (hits as f32 / attempts as f32) * 100.0
}

pub fn run(config: BashConfig, scoreboard: &mut Scoreboard) -> Result<(), String>
{
    let mut term = TerminalGuard::enter_with_mouse().map_err(|err| err.to_string())?;
    let mut rng = rand::thread_rng();
    let mut game = ButtonBash::new(&config, scoreboard.bash_best);
    let mut notice: Option<Notice> = None;
    let mut last_summary: Option<MatchSummary> = None;
    let mut last_tick = Instant::now();

    loop {
        let now = Instant::now();
        let mut quit = false;

        for event in terminal::drain_events()? {
            if let Event::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                ..
            }) = event
            {
                if let Some((x, y)) = arena_cell(column, row) {
                    game.click_at(x, y, now, &mut rng);
                }
                continue;
            }

            let Some((code, modifiers)) = terminal::key_press(&event) else {
                continue;
            };
            if terminal::is_quit(code, modifiers) {
                quit = true;
                break;
            }
            match code {
                KeyCode::Char(' ') | KeyCode::Enter if game.state() != BashState::Running => {
                    game.start(now, &mut rng);
                    last_summary = None;
                    notice = Some(Notice::new("Game started! Hit the targets before they fade", GREEN, now));
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    game.reset();
                    last_summary = None;
                    notice = None;
                }
                KeyCode::Char(ch) if ch.is_ascii_alphabetic() => {
                    game.press(ch, now, &mut rng);
                }
                _ => {}
            }
        }
        if quit {
            break;
        }

        if let Some(summary) = game.update(now, &mut rng) {
            scoreboard.bash_best = game.best();
            notice = Some(if summary.new_best {
                Notice::new(format!("New high score! {} points", summary.score), GOLD, now)
            } else {
                Notice::new(format!("Game over! Final score: {} points", summary.score), ORANGE, now)
            });
            last_summary = Some(summary);
        }

        if last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            draw_ui(term.stdout(), &game, last_summary.as_ref(), notice.as_ref(), now)?;
            last_tick = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    Ok(())
}

fn arena_cell(column: u16, row: u16) -> Option<(u16, u16)>
{
    let x = column.checked_sub(ARENA_LEFT)?;
    let y = row.checked_sub(ARENA_TOP)?;
    if x < ARENA_WIDTH && y < ARENA_HEIGHT {
        Some((x, y))
    } else {
        None
    }
}

fn draw_ui(
    stdout: &mut Stdout,
    game: &ButtonBash,
    summary: Option<&MatchSummary>,
    notice: Option<&Notice>,
    now: Instant,
) -> Result<(), String>
{
    let mut lines = Vec::new();
    lines.push("Arcade - Button Bash Arena".to_string());
    lines.push(format!(
        "Score: {}  Time: {}s  Targets: {}",
        game.score(),
        game.time_left(),
        game.targets().len()
    ));
    lines.push(format!(
        "High score: {}  Hits: {}/{}  Accuracy: {:>5.1}%",
        game.best(),
        game.hits(),
        game.attempts(),
        game.accuracy()
    ));

    let border = format!("+{}+", "-".repeat(ARENA_WIDTH as usize));
    lines.push(border.clone());

    let mut rows: Vec<Vec<Option<(char, Rgb)>>> =
        vec![vec![None; ARENA_WIDTH as usize]; ARENA_HEIGHT as usize];
    for target in game.targets() {
        let age = now.saturating_duration_since(target.spawned_at);
        let urgency = (age.as_secs_f32() / TARGET_TTL.as_secs_f32()).clamp(0.0, 1.0);
        let color = color_for_urgency(urgency);
        let glyphs = ['[', target.label.to_ascii_uppercase(), ']'];
        for (offset, ch) in glyphs.into_iter().enumerate() {
            let col = target.x as usize + offset;
            if col < ARENA_WIDTH as usize {
                rows[target.y as usize][col] = Some((ch, color));
            }
        }
    }
    for row in rows {
        let mut line = String::from("|");
        for cell in row {
            match cell {
                Some((ch, color)) => line.push_str(&paint(&ch.to_string(), color)),
                None => line.push(' '),
            }
        }
        line.push('|');
        lines.push(line);
    }
    lines.push(border);

    match (game.state(), summary) {
        (BashState::Ready, _) => lines.push("Press SPACE to start".to_string()),
        (BashState::Running, _) => lines.push("Click a target or press its letter!".to_string()),
        (BashState::Over, Some(summary)) => lines.push(format!(
            "Final score: {}  Hits: {}/{}  Accuracy: {:>5.1}%  - SPACE to play again",
            summary.score,
            summary.hits,
            summary.attempts,
            compute_accuracy(summary.hits, summary.attempts)
        )),
        (BashState::Over, None) => lines.push("Game over - SPACE to play again".to_string()),
    }
    lines.push(notice.and_then(|notice| notice.render(now)).unwrap_or_default());
    lines.push("Controls: click or type target letters, SPACE start, r reset, ESC back".to_string());

    terminal::present(stdout, &lines)
}

fn color_for_urgency(progress: f32) -> Rgb
{
    let progress = progress.clamp(0.0, 1.0);
    if progress < 0.33 {
        lerp_color(GREEN, YELLOW, progress / 0.33)
    } else if progress < 0.66 {
        lerp_color(YELLOW, ORANGE, (progress - 0.33) / 0.33)
    } else {
        lerp_color(ORANGE, RED, (progress - 0.66) / 0.34)
    }
}

fn lerp_color(start: Rgb, end: Rgb, t: f32) -> Rgb
{
    let t = t.clamp(0.0, 1.0);
    Rgb::new(
        lerp(start.r as f32, end.r as f32, t) as u8,
        lerp(start.g as f32, end.g as f32, t) as u8,
        lerp(start.b as f32, end.b as f32, t) as u8,
    )
}

fn lerp(a: f32, b: f32, t: f32) -> f32
{
    a + (b - a) * t
}
