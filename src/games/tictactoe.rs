use crate::games::terminal::{self, highlight, paint, Notice, Rgb, TerminalGuard};
use crate::games::timer::{Scheduler, TaskId};
use crate::games::Scoreboard;
use crossterm::event::KeyCode;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::Stdout;
use std::time::{Duration, Instant};

const TICK_MS: u64 = 33;
const AI_THINK_DELAY: Duration = Duration::from_millis(500);
const CENTER: usize = 4;
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

const GREEN: Rgb = Rgb::new(0, 255, 0);
const RED: Rgb = Rgb::new(255, 60, 60);
const GOLD: Rgb = Rgb::new(255, 215, 0);
const BLUE: Rgb = Rgb::new(80, 140, 255);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mark
{
    Player,
    Ai,
}

impl Mark
{
    fn symbol(self) -> char
    {
        match self {
            Mark::Player => 'X',
            Mark::Ai => 'O',
        }
    }
}

pub type Board = [Option<Mark>; 9];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome
{
    PlayerWon,
    AiWon,
    Draw,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase
{
    /// Fresh board, nobody has moved yet.
    Idle,
    PlayerTurn,
    AiTurn,
    Over(Outcome),
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TicTacToeScores
{
    pub player: u32,
    pub ai: u32,
    pub draws: u32,
}

#[derive(Clone, Copy)]
enum TimerEvent
{
    AiMove,
}

pub fn check_winner(board: &Board) -> Option<Mark>
{
    LINES.iter().find_map(|&[a, b, c]| match board[a] {
        Some(mark) if board[b] == Some(mark) && board[c] == Some(mark) => Some(mark),
        _ => None,
    })
}

pub fn is_full(board: &Board) -> bool
{
    board.iter().all(|cell| cell.is_some())
}

fn empty_cells(board: &Board) -> Vec<usize>
{
    (0..board.len()).filter(|&idx| board[idx].is_none()).collect()
}

/// True if writing `mark` at `cell` completes one of the lines through it.
fn completes_line(board: &Board, cell: usize, mark: Mark) -> bool
{
    LINES
        .iter()
        .filter(|line| line.contains(&cell))
        .any(|line| {
            line.iter()
                .all(|&idx| idx == cell || board[idx] == Some(mark))
        })
}

/// Greedy single-ply move: win, else block, else center, else random.
pub fn ai_move(board: &Board, rng: &mut impl Rng) -> Option<usize>
{
    let empty = empty_cells(board);
    if empty.is_empty() {
        return None;
    }

    let winning = empty
        .iter()
        .copied()
        .find(|&cell| completes_line(board, cell, Mark::Ai));
    if winning.is_some() {
        return winning;
    }

    let blocking = empty
        .iter()
        .copied()
        .find(|&cell| completes_line(board, cell, Mark::Player));
    if blocking.is_some() {
        return blocking;
    }

    if board[CENTER].is_none() {
        return Some(CENTER);
    }

    empty.choose(rng).copied()
}

pub struct TicTacToe
{
    board: Board,
    phase: Phase,
    scores: TicTacToeScores,
    timers: Scheduler<TimerEvent>,
    reply: Option<TaskId>,
}

impl TicTacToe
{
    pub fn new(scores: TicTacToeScores) -> Self
    {
        Self {
            board: [None; 9],
            phase: Phase::Idle,
            scores,
            timers: Scheduler::new(),
            reply: None,
        }
    }

    pub fn board(&self) -> &Board
    {
        &self.board
    }

    pub fn phase(&self) -> Phase
    {
        self.phase
    }

    pub fn scores(&self) -> TicTacToeScores
    {
        self.scores
    }

    /// Places the player's mark. Anything that is not a legal move is ignored.
    pub fn apply_player_move(&mut self, cell: usize, now: Instant) -> bool
    {
        if !matches!(self.phase, Phase::Idle | Phase::PlayerTurn) {
            return false;
        }
        if cell >= self.board.len() || self.board[cell].is_some() {
            return false;
        }

        self.board[cell] = Some(Mark::Player);
        debug!("player marked cell {cell}");
        if !self.settle() {
            self.phase = Phase::AiTurn;
            self.reply = Some(self.timers.after(AI_THINK_DELAY, now, TimerEvent::AiMove));
        }
        true
    }

    /// Plays the AI's reply immediately. Only valid while it is the AI's turn.
    pub fn apply_ai_move(&mut self, rng: &mut impl Rng) -> Option<usize>
    {
        if self.phase != Phase::AiTurn {
            return None;
        }
        if let Some(id) = self.reply.take() {
            self.timers.cancel(id);
        }
        let cell = ai_move(&self.board, rng)?;
        self.board[cell] = Some(Mark::Ai);
        debug!("ai marked cell {cell}");
        if !self.settle() {
            self.phase = Phase::PlayerTurn;
        }
        Some(cell)
    }

    /// Fires due timers; returns the cell the AI played, if it moved.
    pub fn update(&mut self, now: Instant, rng: &mut impl Rng) -> Option<usize>
    {
        let mut played = None;
        for event in self.timers.poll(now) {
            match event {
                TimerEvent::AiMove => {
                    if let Some(cell) = self.apply_ai_move(rng) {
                        played = Some(cell);
                    }
                }
            }
        }
        played
    }

    pub fn new_game(&mut self)
    {
        if let Some(id) = self.reply.take() {
            self.timers.cancel(id);
        }
        self.board = [None; 9];
        self.phase = Phase::Idle;
    }

    pub fn reset_scores(&mut self)
    {
        self.new_game();
        self.scores = TicTacToeScores::default();
        info!("tic-tac-toe scores reset");
    }

    /// Ends the game if the board is terminal. Returns true when it did.
    fn settle(&mut self) -> bool
    {
        let outcome = match check_winner(&self.board) {
            Some(Mark::Player) => Outcome::PlayerWon,
            Some(Mark::Ai) => Outcome::AiWon,
            None if is_full(&self.board) => Outcome::Draw,
            None => return false,
        };

        match outcome {
            Outcome::PlayerWon => self.scores.player += 1,
            Outcome::AiWon => self.scores.ai += 1,
            Outcome::Draw => self.scores.draws += 1,
        }
        self.timers.clear();
        self.reply = None;
        self.phase = Phase::Over(outcome);
        info!(
            "tic-tac-toe over: {:?} (player {}, ai {}, draws {})",
            outcome, self.scores.player, self.scores.ai, self.scores.draws
        );
        true
    }
}

pub fn run(scoreboard: &mut Scoreboard) -> Result<(), String>
{
    let mut term = TerminalGuard::enter().map_err(|err| err.to_string())?;
    let mut rng = rand::thread_rng();
    let mut game = TicTacToe::new(scoreboard.tictactoe);
    let mut cursor = CENTER;
    let mut notice: Option<Notice> = None;
    let mut last_tick = Instant::now();

    info!("tic-tac-toe started");
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
            let before = game.phase();
            match code {
                KeyCode::Up if cursor >= 3 => cursor -= 3,
                KeyCode::Down if cursor < 6 => cursor += 3,
                KeyCode::Left if cursor % 3 > 0 => cursor -= 1,
                KeyCode::Right if cursor % 3 < 2 => cursor += 1,
                KeyCode::Enter | KeyCode::Char(' ') => {
                    game.apply_player_move(cursor, now);
                }
                KeyCode::Char(ch @ '1'..='9') => {
                    let cell = (ch as usize) - ('1' as usize);
                    cursor = cell;
                    game.apply_player_move(cell, now);
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    game.new_game();
                    notice = None;
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    game.reset_scores();
                    notice = Some(Notice::new("Scores reset", BLUE, now));
                }
                _ => {}
            }
            if let Some(fresh) = outcome_notice(before, game.phase(), now) {
                notice = Some(fresh);
            }
        }
        if quit {
            break;
        }

        let before = game.phase();
        game.update(now, &mut rng);
        if let Some(fresh) = outcome_notice(before, game.phase(), now) {
            notice = Some(fresh);
        }
        scoreboard.tictactoe = game.scores();

        if last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            draw_ui(term.stdout(), &game, cursor, notice.as_ref(), now)?;
            last_tick = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    scoreboard.tictactoe = game.scores();
    Ok(())
}

fn outcome_notice(before: Phase, after: Phase, now: Instant) -> Option<Notice>
{
    if before == after {
        return None;
    }
    match after {
        Phase::Over(Outcome::PlayerWon) => Some(Notice::new("You Win! Congratulations!", GREEN, now)),
        Phase::Over(Outcome::AiWon) => Some(Notice::new("AI Wins! Better luck next time!", RED, now)),
        Phase::Over(Outcome::Draw) => Some(Notice::new("It's a Draw! Good game!", GOLD, now)),
        _ => None,
    }
}

fn draw_ui(
    stdout: &mut Stdout,
    game: &TicTacToe,
    cursor: usize,
    notice: Option<&Notice>,
    now: Instant,
) -> Result<(), String>
{
    let scores = game.scores();
    let mut lines = Vec::new();
    lines.push("Arcade - Tic-Tac-Toe".to_string());
    lines.push(format!(
        "You (X): {}  AI (O): {}  Draws: {}",
        scores.player, scores.ai, scores.draws
    ));
    lines.push(
        match game.phase() {
            Phase::Idle | Phase::PlayerTurn => "Your turn",
            Phase::AiTurn => "AI is thinking...",
            Phase::Over(Outcome::PlayerWon) => "You won!",
            Phase::Over(Outcome::AiWon) => "AI won!",
            Phase::Over(Outcome::Draw) => "Draw!",
        }
        .to_string(),
    );
    lines.push(String::new());

    let board = game.board();
    for row in 0..3 {
        let mut line = String::from("   ");
        for col in 0..3 {
            let idx = row * 3 + col;
            let glyph = match board[idx] {
                Some(mark) => {
                    let color = if mark == Mark::Player { BLUE } else { RED };
                    paint(&format!(" {} ", mark.symbol()), color)
                }
                None => format!(" {} ", idx + 1),
            };
            if idx == cursor && !matches!(game.phase(), Phase::Over(_)) {
                line.push_str(&highlight(&glyph, Rgb::new(60, 60, 60)));
            } else {
                line.push_str(&glyph);
            }
            if col < 2 {
                line.push('|');
            }
        }
        lines.push(line);
        if row < 2 {
            lines.push("   ---+---+---".to_string());
        }
    }

    lines.push(String::new());
    lines.push(notice.and_then(|notice| notice.render(now)).unwrap_or_default());
    lines.push("Controls: arrows + Enter or 1-9 to mark, n new game, r reset scores, ESC back".to_string());

    terminal::present(stdout, &lines)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const X: Option<Mark> = Some(Mark::Player);
    const O: Option<Mark> = Some(Mark::Ai);
    const E: Option<Mark> = None;

    fn rng() -> ChaCha8Rng
    {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn cell() -> impl Strategy<Value = Option<Mark>>
    {
        prop_oneof![Just(E), Just(X), Just(O)]
    }

    fn uniform_line(board: &Board, mark: Mark) -> bool
    {
        LINES
            .iter()
            .any(|line| line.iter().all(|&idx| board[idx] == Some(mark)))
    }

    proptest! {
        #[test]
        fn winner_iff_uniform_line(board in proptest::array::uniform9(cell())) {
            match check_winner(&board) {
                Some(mark) => prop_assert!(uniform_line(&board, mark)),
                None => {
                    prop_assert!(!uniform_line(&board, Mark::Player));
                    prop_assert!(!uniform_line(&board, Mark::Ai));
                }
            }
        }

        #[test]
        fn ai_never_skips_its_own_win(board in proptest::array::uniform9(cell()), seed in any::<u64>()) {
            prop_assume!(check_winner(&board).is_none());
            let empty = empty_cells(&board);
            prop_assume!(empty.iter().any(|&cell| completes_line(&board, cell, Mark::Ai)));

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let cell = ai_move(&board, &mut rng).unwrap();
            let mut after = board;
            after[cell] = O;
            prop_assert_eq!(check_winner(&after), Some(Mark::Ai));
        }

        #[test]
        fn ai_always_picks_an_empty_cell(board in proptest::array::uniform9(cell()), seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            match ai_move(&board, &mut rng) {
                Some(cell) => prop_assert!(board[cell].is_none()),
                None => prop_assert!(is_full(&board)),
            }
        }
    }

    #[test]
    fn detects_rows_columns_and_diagonals()
    {
        assert_eq!(check_winner(&[X, X, X, E, O, E, O, E, E]), Some(Mark::Player));
        assert_eq!(check_winner(&[O, X, E, O, X, E, O, E, X]), Some(Mark::Ai));
        assert_eq!(check_winner(&[E, E, O, X, O, X, O, X, E]), Some(Mark::Ai));
        assert_eq!(check_winner(&[X, O, X, X, O, O, O, X, X]), None);
        assert_eq!(check_winner(&[E; 9]), None);
    }

    #[test]
    fn ai_blocks_two_in_a_row()
    {
        let board = [X, X, E, E, E, E, E, E, E];
        assert_eq!(ai_move(&board, &mut rng()), Some(2));
    }

    #[test]
    fn ai_prefers_winning_over_blocking()
    {
        // Player threatens 2, AI can finish the middle row at 5.
        let board = [X, X, E, O, O, E, X, E, E];
        assert_eq!(ai_move(&board, &mut rng()), Some(5));
    }

    #[test]
    fn ai_takes_center_then_random()
    {
        assert_eq!(ai_move(&[X, E, E, E, E, E, E, E, E], &mut rng()), Some(CENTER));

        let board = [E, E, E, E, X, E, E, E, E];
        let cell = ai_move(&board, &mut rng()).unwrap();
        assert_ne!(cell, CENTER);
        assert!(board[cell].is_none());
    }

    #[test]
    fn ai_has_no_move_on_full_board()
    {
        assert_eq!(ai_move(&[X, O, X, X, O, O, O, X, X], &mut rng()), None);
    }

    #[test]
    fn ai_replies_after_think_delay()
    {
        let start = Instant::now();
        let mut rng = rng();
        let mut game = TicTacToe::new(TicTacToeScores::default());
        assert_eq!(game.phase(), Phase::Idle);

        assert!(game.apply_player_move(0, start));
        assert_eq!(game.phase(), Phase::AiTurn);
        assert_eq!(game.update(start + Duration::from_millis(499), &mut rng), None);

        assert_eq!(game.update(start + AI_THINK_DELAY, &mut rng), Some(CENTER));
        assert_eq!(game.board()[CENTER], O);
        assert_eq!(game.phase(), Phase::PlayerTurn);
    }

    #[test]
    fn illegal_player_moves_are_ignored()
    {
        let start = Instant::now();
        let mut game = TicTacToe::new(TicTacToeScores::default());

        assert!(!game.apply_player_move(9, start));
        assert!(game.apply_player_move(0, start));
        // AI turn, not ours.
        assert!(!game.apply_player_move(1, start));

        game.apply_ai_move(&mut rng());
        // Occupied.
        assert!(!game.apply_player_move(0, start));
        assert!(!game.apply_player_move(CENTER, start));
        assert_eq!(game.board().iter().filter(|cell| cell.is_some()).count(), 2);
    }

    #[test]
    fn end_to_end_block_scenario()
    {
        let start = Instant::now();
        let mut rng = rng();
        let mut game = TicTacToe::new(TicTacToeScores::default());

        game.apply_player_move(0, start);
        assert_eq!(game.update(start + AI_THINK_DELAY, &mut rng), Some(CENTER));
        game.apply_player_move(1, start + AI_THINK_DELAY);
        assert_eq!(game.update(start + AI_THINK_DELAY * 2, &mut rng), Some(2));
        assert_eq!(game.phase(), Phase::PlayerTurn);
    }

    #[test]
    fn scores_survive_new_game_but_not_reset()
    {
        let start = Instant::now();
        let mut rng = rng();
        let mut game = TicTacToe::new(TicTacToeScores::default());

        // X: 0, 1 then 8; AI: 4, 2 wins on the 2-4-6 diagonal after 6.
        game.apply_player_move(0, start);
        game.apply_ai_move(&mut rng);
        game.apply_player_move(1, start);
        assert_eq!(game.apply_ai_move(&mut rng), Some(2));
        game.apply_player_move(8, start);
        assert_eq!(game.apply_ai_move(&mut rng), Some(6));
        assert_eq!(game.phase(), Phase::Over(Outcome::AiWon));
        assert_eq!(game.scores().ai, 1);

        // Terminal: nothing else is processed.
        assert!(!game.apply_player_move(3, start));
        assert_eq!(game.apply_ai_move(&mut rng), None);

        game.new_game();
        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.board(), &[E; 9]);
        assert_eq!(game.scores().ai, 1);

        game.reset_scores();
        assert_eq!(game.scores(), TicTacToeScores::default());
    }

    #[test]
    fn new_game_cancels_pending_ai_reply()
    {
        let start = Instant::now();
        let mut rng = rng();
        let mut game = TicTacToe::new(TicTacToeScores::default());

        game.apply_player_move(0, start);
        game.new_game();
        assert_eq!(game.update(start + Duration::from_secs(5), &mut rng), None);
        assert_eq!(game.board(), &[E; 9]);
        assert_eq!(game.phase(), Phase::Idle);
    }

    #[test]
    fn draw_counts_once()
    {
        let start = Instant::now();
        let mut game = TicTacToe::new(TicTacToeScores::default());
        game.board = [X, O, X, X, O, O, O, X, E];
        game.phase = Phase::PlayerTurn;

        assert!(game.apply_player_move(8, start));
        assert_eq!(game.phase(), Phase::Over(Outcome::Draw));
        assert_eq!(game.scores().draws, 1);
        assert!(game.timers.is_empty());
    }
}
