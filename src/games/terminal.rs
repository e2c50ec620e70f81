use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

/// How long a status notification stays on screen.
const NOTICE_TTL: Duration = Duration::from_millis(2500);

/// Raw mode + alternate screen for the lifetime of a game screen.
pub struct TerminalGuard
{
    stdout: Stdout,
    mouse: bool,
}

impl TerminalGuard
{
    pub fn enter() -> io::Result<Self>
    {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self {
            stdout,
            mouse: false,
        })
    }

    pub fn enter_with_mouse() -> io::Result<Self>
    {
        let mut guard = Self::enter()?;
        execute!(guard.stdout, EnableMouseCapture)?;
        guard.mouse = true;
        Ok(guard)
    }

    pub fn stdout(&mut self) -> &mut Stdout
    {
        &mut self.stdout
    }
}

impl Drop for TerminalGuard
{
    fn drop(&mut self)
    {
        if self.mouse {
            let _ = execute!(self.stdout, DisableMouseCapture);
        }
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rgb
{
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb
{
    pub const fn new(r: u8, g: u8, b: u8) -> Self
    {
        Self { r, g, b }
    }
}

pub fn paint(text: &str, color: Rgb) -> String
{
    format!("\x1b[38;2;{};{};{}m{}\x1b[0m", color.r, color.g, color.b, text)
}

pub fn highlight(text: &str, background: Rgb) -> String
{
    format!(
        "\x1b[48;2;{};{};{}m{}\x1b[0m",
        background.r, background.g, background.b, text
    )
}

/// Clears the screen and writes the given lines from the top-left corner.
pub fn present(stdout: &mut Stdout, lines: &[String]) -> Result<(), String>
{
    let output = format!("{}\r\n", lines.join("\r\n"));
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All)).map_err(|err| err.to_string())?;
    stdout.write_all(output.as_bytes()).map_err(|err| err.to_string())?;
    stdout.flush().map_err(|err| err.to_string())?;
    Ok(())
}

/// Drains every pending terminal event without blocking.
pub fn drain_events() -> Result<Vec<Event>, String>
{
    let mut events = Vec::new();
    while event::poll(Duration::from_millis(0)).map_err(|err| err.to_string())? {
        events.push(event::read().map_err(|err| err.to_string())?);
    }
    Ok(events)
}

/// Key presses only; releases and repeats reported by some terminals are dropped.
pub fn key_press(event: &Event) -> Option<(KeyCode, KeyModifiers)>
{
    match event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) => Some((*code, *modifiers)),
        _ => None,
    }
}

pub fn is_quit(code: KeyCode, modifiers: KeyModifiers) -> bool
{
    match code {
        KeyCode::Esc => true,
        KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Transient message shown under a game screen, the terminal stand-in for a toast.
pub struct Notice
{
    text: String,
    color: Rgb,
    shown_at: Instant,
}

impl Notice
{
    pub fn new(text: impl Into<String>, color: Rgb, now: Instant) -> Self
    {
        Self {
            text: text.into(),
            color,
            shown_at: now,
        }
    }

    pub fn render(&self, now: Instant) -> Option<String>
    {
        if now.saturating_duration_since(self.shown_at) < NOTICE_TTL {
            Some(paint(&self.text, self.color))
        } else {
            None
        }
    }
}
