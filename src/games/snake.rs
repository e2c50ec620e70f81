use crate::games::terminal::{self, paint, Notice, Rgb, TerminalGuard};
use crate::games::timer::Scheduler;
use crate::games::Scoreboard;
use crossterm::event::KeyCode;
use log::{debug, info};
use rand::Rng;
use std::collections::VecDeque;
use std::io::Stdout;
use std::time::{Duration, Instant};

const TICK_MS: u64 = 33;
const FOOD_POINTS: u32 = 10;
const DEFAULT_STEP_MS: u64 = 150;
const MIN_STEP_MS: u64 = 50;
const MAX_STEP_MS: u64 = 1000;

const GREEN: Rgb = Rgb::new(0, 255, 0);
const DARK_GREEN: Rgb = Rgb::new(0, 170, 60);
const RED: Rgb = Rgb::new(255, 60, 60);
const GREY: Rgb = Rgb::new(70, 70, 70);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction
{
    Up,
    Down,
    Left,
    Right,
}

impl Direction
{
    pub fn opposite(self) -> Self
    {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn delta(self) -> (i32, i32)
    {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Arrow keys and WASD, either case.
    pub fn from_key(code: KeyCode) -> Option<Self>
    {
        match code {
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
            KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
            KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Pos
{
    pub x: i32,
    pub y: i32,
}

impl Pos
{
    pub const fn new(x: i32, y: i32) -> Self
    {
        Self { x, y }
    }

    fn step(self, direction: Direction) -> Self
    {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Board size presets. `Compact` is the small-screen layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum GridPreset
{
    Classic,
    Compact,
}

impl GridPreset
{
    pub fn size(self) -> i32
    {
        match self {
            GridPreset::Classic => 20,
            GridPreset::Compact => 15,
        }
    }
}

pub struct SnakeConfig
{
    grid_size: i32,
    step: Duration,
}

impl SnakeConfig
{
    pub fn new(grid: GridPreset, step_ms: u64) -> Self
    {
        Self {
            grid_size: grid.size(),
            step: Duration::from_millis(step_ms.clamp(MIN_STEP_MS, MAX_STEP_MS)),
        }
    }

    pub fn grid_size(&self) -> i32
    {
        self.grid_size
    }
}

impl Default for SnakeConfig
{
    fn default() -> Self
    {
        Self::new(GridPreset::Classic, DEFAULT_STEP_MS)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SnakeState
{
    Ready,
    Running,
    Over,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepResult
{
    Moved,
    Ate,
    Collided,
}

#[derive(Clone, Copy)]
enum TimerEvent
{
    Step,
}

pub struct Snake
{
    grid_size: i32,
    step: Duration,
    body: VecDeque<Pos>,
    food: Pos,
    direction: Direction,
    pending: Option<Direction>,
    score: u32,
    state: SnakeState,
    timers: Scheduler<TimerEvent>,
}

impl Snake
{
    pub fn new(config: &SnakeConfig) -> Self
    {
        let mut snake = Self {
            grid_size: config.grid_size(),
            step: config.step,
            body: VecDeque::new(),
            food: Pos::new(0, 0),
            direction: Direction::Right,
            pending: None,
            score: 0,
            state: SnakeState::Ready,
            timers: Scheduler::new(),
        };
        snake.reset();
        snake
    }

    pub fn body(&self) -> &VecDeque<Pos>
    {
        &self.body
    }

    pub fn head(&self) -> Pos
    {
        self.body[0]
    }

    pub fn food(&self) -> Pos
    {
        self.food
    }

    pub fn direction(&self) -> Direction
    {
        self.direction
    }

    pub fn score(&self) -> u32
    {
        self.score
    }

    pub fn state(&self) -> SnakeState
    {
        self.state
    }

    pub fn grid_size(&self) -> i32
    {
        self.grid_size
    }

    /// Back to a single centered segment heading right, timers stopped.
    pub fn reset(&mut self)
    {
        let center = self.grid_size / 2;
        let food = self.grid_size * 3 / 4;
        self.timers.clear();
        self.body = VecDeque::from([Pos::new(center, center)]);
        self.food = Pos::new(food, food);
        self.direction = Direction::Right;
        self.pending = None;
        self.score = 0;
        self.state = SnakeState::Ready;
    }

    pub fn start(&mut self, now: Instant)
    {
        if self.state != SnakeState::Ready {
            return;
        }
        self.state = SnakeState::Running;
        self.timers.every(self.step, now, TimerEvent::Step);
        info!("snake started on a {0}x{0} grid", self.grid_size);
    }

    /// Buffers a turn for the next step. Reversing onto the neck is refused.
    pub fn steer(&mut self, direction: Direction) -> bool
    {
        if self.state != SnakeState::Running || direction == self.direction.opposite() {
            return false;
        }
        self.pending = Some(direction);
        true
    }

    /// Advances the snake by one cell.
    pub fn step(&mut self, rng: &mut impl Rng) -> StepResult
    {
        if self.state != SnakeState::Running {
            return StepResult::Collided;
        }
        if let Some(direction) = self.pending.take() {
            self.direction = direction;
        }

        let head = self.head().step(self.direction);
        if !self.in_bounds(head) || self.body.contains(&head) {
            self.state = SnakeState::Over;
            self.timers.clear();
            info!("snake crashed at ({}, {}) with score {}", head.x, head.y, self.score);
            return StepResult::Collided;
        }

        self.body.push_front(head);
        if head == self.food {
            self.score += FOOD_POINTS;
            self.food = self.random_cell(rng);
            debug!("snake ate, length {} score {}", self.body.len(), self.score);
            StepResult::Ate
        } else {
            self.body.pop_back();
            StepResult::Moved
        }
    }

    /// Runs every step that came due since the last call.
    pub fn update(&mut self, now: Instant, rng: &mut impl Rng) -> Vec<StepResult>
    {
        let mut results = Vec::new();
        for event in self.timers.poll(now) {
            match event {
                TimerEvent::Step => {
                    if self.state == SnakeState::Running {
                        results.push(self.step(rng));
                    }
                }
            }
        }
        results
    }

    fn in_bounds(&self, pos: Pos) -> bool
    {
        (0..self.grid_size).contains(&pos.x) && (0..self.grid_size).contains(&pos.y)
    }

    // Food may land on the body; it only becomes reachable once the tail passes.
    fn random_cell(&self, rng: &mut impl Rng) -> Pos
    {
        Pos::new(
            rng.gen_range(0..self.grid_size),
            rng.gen_range(0..self.grid_size),
        )
    }
}

pub fn run(config: SnakeConfig, scoreboard: &mut Scoreboard) -> Result<(), String>
{
    let mut term = TerminalGuard::enter().map_err(|err| err.to_string())?;
    let mut rng = rand::thread_rng();
    let mut game = Snake::new(&config);
    let mut notice: Option<Notice> = None;
    let mut last_tick = Instant::now();

    loop {
        let now = Instant::now();
        let mut quit = false;

        for event in terminal::drain_events()? {
            let Some((code, modifiers)) = terminal::key_press(&event) else {
                continue;
            };
            if terminal::is_quit(code, modifiers) {
                quit = true;
                break;
            }
            if let Some(direction) = Direction::from_key(code) {
                game.steer(direction);
                continue;
            }
            match code {
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if game.state() == SnakeState::Over {
                        game.reset();
                    }
                    if game.state() == SnakeState::Ready {
                        game.start(now);
                        notice = Some(Notice::new("Game started! Arrows or WASD to steer", GREEN, now));
                    }
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    game.reset();
                    notice = None;
                }
                _ => {}
            }
        }
        if quit {
            break;
        }

        for result in game.update(now, &mut rng) {
            match result {
                StepResult::Ate => {
                    notice = Some(Notice::new(format!("Food eaten! +{FOOD_POINTS} points"), GREEN, now));
                }
                StepResult::Collided => {
                    notice = Some(Notice::new(format!("Game over! Final score: {}", game.score()), RED, now));
                    if scoreboard.record_snake(game.score()) {
                        info!("new snake best score {}", game.score());
                    }
                }
                StepResult::Moved => {}
            }
        }

        if last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            draw_ui(term.stdout(), &game, scoreboard.snake_best, notice.as_ref(), now)?;
            last_tick = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    Ok(())
}

fn draw_ui(
    stdout: &mut Stdout,
    game: &Snake,
    best: u32,
    notice: Option<&Notice>,
    now: Instant,
) -> Result<(), String>
{
    let size = game.grid_size();
    let mut lines = Vec::new();
    lines.push("Arcade - Snake".to_string());
    lines.push(format!(
        "Score: {}  Best: {}  Length: {}  Heading: {:?}",
        game.score(),
        best,
        game.body().len(),
        game.direction()
    ));
    lines.push(
        match game.state() {
            SnakeState::Ready => "Press SPACE to start",
            SnakeState::Running => "Running",
            SnakeState::Over => "Game over - SPACE to play again",
        }
        .to_string(),
    );

    let border = format!("+{}+", "-".repeat(size as usize * 2));
    lines.push(border.clone());
    for y in 0..size {
        let mut row = String::from("|");
        for x in 0..size {
            let pos = Pos::new(x, y);
            let cell = if pos == game.head() {
                paint("██", GREEN)
            } else if game.body().contains(&pos) {
                paint("▓▓", DARK_GREEN)
            } else if pos == game.food() {
                paint("()", RED)
            } else {
                paint(" .", GREY)
            };
            row.push_str(&cell);
        }
        row.push('|');
        lines.push(row);
    }
    lines.push(border);

    lines.push(notice.and_then(|notice| notice.render(now)).unwrap_or_default());
    lines.push("Controls: arrows/WASD steer, SPACE start, r reset, ESC back".to_string());

    terminal::present(stdout, &lines)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng
    {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn running(grid: GridPreset) -> Snake
    {
        let mut snake = Snake::new(&SnakeConfig::new(grid, DEFAULT_STEP_MS));
        snake.start(Instant::now());
        snake
    }

    fn direction() -> impl Strategy<Value = Direction>
    {
        prop_oneof![
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
        ]
    }

    proptest! {
        #[test]
        fn one_step_offsets_head_by_direction(dir in direction()) {
            let mut snake = running(GridPreset::Classic);
            snake.food = Pos::new(0, 0);
            let head = snake.head();
            snake.steer(dir);
            snake.step(&mut rng());

            let expected = if dir == Direction::Left { Direction::Right } else { dir };
            let (dx, dy) = expected.delta();
            prop_assert_eq!(snake.head(), Pos::new(head.x + dx, head.y + dy));
            prop_assert_eq!(snake.body().len(), 1);
        }

        #[test]
        fn reversal_is_a_no_op(dir in direction()) {
            let mut snake = running(GridPreset::Classic);
            snake.direction = dir;
            prop_assert!(!snake.steer(dir.opposite()));
            prop_assert_eq!(snake.pending, None);
            prop_assert_eq!(snake.direction(), dir);
        }
    }

    #[test]
    fn starts_centered_with_food_in_lower_right()
    {
        let snake = Snake::new(&SnakeConfig::default());
        assert_eq!(snake.body(), &VecDeque::from([Pos::new(10, 10)]));
        assert_eq!(snake.food(), Pos::new(15, 15));
        assert_eq!(snake.direction(), Direction::Right);
        assert_eq!(snake.state(), SnakeState::Ready);
    }

    #[test]
    fn compact_grid_eats_food_on_first_tick()
    {
        let start = Instant::now();
        let mut rng = rng();
        let mut snake = Snake::new(&SnakeConfig::new(GridPreset::Compact, DEFAULT_STEP_MS));
        assert_eq!(snake.head(), Pos::new(7, 7));
        snake.food = Pos::new(8, 7);
        snake.start(start);

        let results = snake.update(start + Duration::from_millis(DEFAULT_STEP_MS), &mut rng);
        assert_eq!(results, vec![StepResult::Ate]);
        assert_eq!(snake.body(), &VecDeque::from([Pos::new(8, 7), Pos::new(7, 7)]));
        assert_eq!(snake.score(), 10);
    }

    #[test]
    fn plain_step_keeps_length()
    {
        let mut snake = running(GridPreset::Classic);
        snake.body = VecDeque::from([Pos::new(5, 5), Pos::new(4, 5), Pos::new(3, 5)]);
        assert_eq!(snake.step(&mut rng()), StepResult::Moved);
        assert_eq!(
            snake.body(),
            &VecDeque::from([Pos::new(6, 5), Pos::new(5, 5), Pos::new(4, 5)])
        );
    }

    #[test]
    fn wall_ends_the_game_and_stops_timers()
    {
        let start = Instant::now();
        let mut snake = Snake::new(&SnakeConfig::default());
        snake.body = VecDeque::from([Pos::new(19, 3)]);
        snake.start(start);

        let results = snake.update(start + Duration::from_secs(2), &mut rng());
        assert_eq!(results, vec![StepResult::Collided]);
        assert_eq!(snake.state(), SnakeState::Over);
        assert_eq!(snake.head(), Pos::new(19, 3));
        assert!(snake.timers.is_empty());

        assert!(!snake.steer(Direction::Up));
        assert_eq!(snake.step(&mut rng()), StepResult::Collided);
    }

    #[test]
    fn running_into_own_body_ends_the_game()
    {
        let mut snake = running(GridPreset::Classic);
        snake.body = VecDeque::from([
            Pos::new(5, 5),
            Pos::new(4, 5),
            Pos::new(4, 6),
            Pos::new(5, 6),
            Pos::new(6, 6),
        ]);
        assert!(snake.steer(Direction::Down));
        assert_eq!(snake.step(&mut rng()), StepResult::Collided);
        assert_eq!(snake.state(), SnakeState::Over);
        assert_eq!(snake.body().len(), 5);
    }

    #[test]
    fn turn_applies_on_next_step_only()
    {
        let mut snake = running(GridPreset::Classic);
        assert!(snake.steer(Direction::Up));
        assert_eq!(snake.direction(), Direction::Right);
        snake.step(&mut rng());
        assert_eq!(snake.direction(), Direction::Up);
        assert_eq!(snake.head(), Pos::new(10, 9));
    }

    #[test]
    fn eaten_food_respawns_inside_grid()
    {
        let mut rng = rng();
        let mut snake = running(GridPreset::Compact);
        for _ in 0..20 {
            snake.body = VecDeque::from([Pos::new(1, 1)]);
            snake.direction = Direction::Right;
            snake.food = Pos::new(2, 1);
            assert_eq!(snake.step(&mut rng), StepResult::Ate);
            assert!(snake.in_bounds(snake.food()));
        }
        assert_eq!(snake.score(), 200);
    }

    #[test]
    fn input_ignored_until_started_and_reset_rearms()
    {
        let start = Instant::now();
        let mut snake = Snake::new(&SnakeConfig::default());
        assert!(!snake.steer(Direction::Up));
        assert!(snake.update(start + Duration::from_secs(1), &mut rng()).is_empty());

        snake.start(start);
        snake.update(start + Duration::from_millis(300), &mut rng());
        assert_eq!(snake.head(), Pos::new(12, 10));

        snake.reset();
        assert_eq!(snake.state(), SnakeState::Ready);
        assert_eq!(snake.head(), Pos::new(10, 10));
        assert!(snake.update(start + Duration::from_secs(10), &mut rng()).is_empty());
        assert_eq!(snake.head(), Pos::new(10, 10));
    }

    #[test]
    fn config_clamps_step_interval()
    {
        assert_eq!(SnakeConfig::new(GridPreset::Classic, 1).step, Duration::from_millis(MIN_STEP_MS));
        assert_eq!(SnakeConfig::new(GridPreset::Compact, 90_000).step, Duration::from_millis(MAX_STEP_MS));
        assert_eq!(SnakeConfig::new(GridPreset::Compact, 150).grid_size(), 15);
    }

    #[test]
    fn keys_map_to_directions()
    {
        assert_eq!(Direction::from_key(KeyCode::Char('W')), Some(Direction::Up));
        assert_eq!(Direction::from_key(KeyCode::Left), Some(Direction::Left));
        assert_eq!(Direction::from_key(KeyCode::Char('x')), None);
    }
}
