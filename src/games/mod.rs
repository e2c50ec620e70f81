pub mod bash;
pub mod snake;
pub mod terminal;
pub mod tictactoe;
pub mod timer;

use log::info;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameId
{
    Snake,
    TicTacToe,
    ButtonBash,
}

pub struct GameDescriptor
{
    pub id: GameId,
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub fn registry() -> Vec<GameDescriptor>
{
    vec![
        GameDescriptor {
            id: GameId::Snake,
            name: "snake",
            title: "Snake Classic",
            description: "Eat food and grow longer, don't hit the walls",
        },
        GameDescriptor {
            id: GameId::TicTacToe,
            name: "tictactoe",
            title: "Tic-Tac-Toe",
            description: "Beat the AI on a 3x3 board",
        },
        GameDescriptor {
            id: GameId::ButtonBash,
            name: "bash",
            title: "Button Bash Arena",
            description: "Hit the targets before they disappear",
        },
    ]
}

pub fn find(choice: &str) -> Option<GameDescriptor>
{
    let registry = registry();
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= registry.len() {
            return registry.into_iter().nth(index - 1);
        }
        return None;
    }
    registry
        .into_iter()
        .find(|game| game.name.eq_ignore_ascii_case(choice))
}

/// Scores that outlive a single game screen for the rest of the session.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Scoreboard
{
    pub tictactoe: tictactoe::TicTacToeScores,
    pub snake_best: u32,
    pub bash_best: u32,
}

impl Scoreboard
{
    /// Returns true when `score` beats the previous snake best.
    pub fn record_snake(&mut self, score: u32) -> bool
    {
        if score > self.snake_best {
            self.snake_best = score;
            true
        } else {
            false
        }
    }
}

/// Which game screen is showing, if any.
#[derive(Default)]
pub struct Selector
{
    active: Option<GameId>,
}

impl Selector
{
    pub fn active(&self) -> Option<GameId>
    {
        self.active
    }

    pub fn select(&mut self, game: GameId)
    {
        info!("switching to {:?}", game);
        self.active = Some(game);
    }

    pub fn back(&mut self)
    {
        if let Some(game) = self.active.take() {
            info!("leaving {:?}", game);
        }
    }
}
