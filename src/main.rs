mod games;
mod logging;

use clap::{Parser, Subcommand};
use games::bash::BashConfig;
use games::snake::{GridPreset, SnakeConfig};
use games::{GameId, Scoreboard, Selector};
use log::info;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arcade-games", about = "Snake, Tic-Tac-Toe and Button Bash in the terminal")]
struct Cli
{
    #[arg(long, help = "File that receives log records. Logging is off without it.")]
    log_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "info", help = "Max level written to the log file")]
    log_level: logging::LogLevel,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command
{
    /// List the available games
    List,
    /// Snake Classic
    Snake
    {
        #[arg(long, value_enum, default_value = "classic", help = "classic is 20x20, compact is 15x15")]
        grid: GridPreset,
        #[arg(long, default_value_t = 150, help = "Milliseconds between snake steps (50-1000)")]
        tick_ms: u64,
    },
    /// Tic-Tac-Toe against a greedy AI
    Tictactoe,
    /// Button Bash Arena
    Bash
    {
        #[arg(long, default_value_t = 30, help = "Match length in seconds (5-300)")]
        duration: u32,
    },
}

fn main()
{
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String>
{
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref(), cli.log_level)?;
    info!("arcade-games starting");

    let mut scoreboard = Scoreboard::default();
    let mut selector = Selector::default();
    match cli.command {
        None => interactive_menu(&mut selector, &mut scoreboard),
        Some(Command::List) => {
            list_games();
            Ok(())
        }
        Some(Command::Snake { grid, tick_ms }) => {
            selector.select(GameId::Snake);
            let result = games::snake::run(SnakeConfig::new(grid, tick_ms), &mut scoreboard);
            selector.back();
            result
        }
        Some(Command::Tictactoe) => play(&mut selector, &mut scoreboard, GameId::TicTacToe),
        Some(Command::Bash { duration }) => {
            selector.select(GameId::ButtonBash);
            let result = games::bash::run(BashConfig::new(duration), &mut scoreboard);
            selector.back();
            result
        }
    }
}

/// Shows one game with default settings and hands control back afterwards.
fn play(selector: &mut Selector, scoreboard: &mut Scoreboard, game: GameId) -> Result<(), String>
{
    selector.select(game);
    let result = match selector.active() {
        Some(GameId::Snake) => games::snake::run(SnakeConfig::default(), scoreboard),
        Some(GameId::TicTacToe) => games::tictactoe::run(scoreboard),
        Some(GameId::ButtonBash) => games::bash::run(BashConfig::default(), scoreboard),
        None => Ok(()),
    };
    selector.back();
    result
}

fn interactive_menu(selector: &mut Selector, scoreboard: &mut Scoreboard) -> Result<(), String>
{
    loop {
        let registry = games::registry();
        println!("Game Arena");
        println!();
        println!("Choose your challenge:");
        for (idx, game) in registry.iter().enumerate() {
            println!("  {}. {} - {}", idx + 1, game.title, game.description);
        }
        println!();
        println!(
            "Session: snake best {}  tic-tac-toe {}-{}-{}  bash best {}",
            scoreboard.snake_best,
            scoreboard.tictactoe.player,
            scoreboard.tictactoe.ai,
            scoreboard.tictactoe.draws,
            scoreboard.bash_best
        );
        print!("Enter number or name (default 1, q to quit): ");
        std::io::stdout()
            .flush()
            .map_err(|err| format!("Failed to flush stdout: {err}"))?;

        let mut input = String::new();
        let read = std::io::stdin()
            .read_line(&mut input)
            .map_err(|err| format!("Failed to read input: {err}"))?;
        if read == 0 {
            return Ok(());
        }
        let choice = input.trim();

        if choice.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        let game = if choice.is_empty() {
            games::find("1")
        } else {
            games::find(choice)
        };
        match game {
            Some(game) => play(selector, scoreboard, game.id)?,
            None => println!("Invalid selection '{choice}'.\n"),
        }
    }
}

fn list_games()
{
    println!("Available games:");
    for game in games::registry() {
        println!("  {:<10} - {}", game.name, game.description);
    }
}
