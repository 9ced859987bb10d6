use std::io::stdout;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};
use log::debug;

const WIDTH: usize = 16;

/// Whether a progress line has been drawn but not yet ended.
static LINE_OPEN: AtomicBool = AtomicBool::new(false);

/// Redraws the progress line in place, ending it once `fraction` reaches 1.
pub fn draw(fraction: f64) {
    let line = render(fraction);
    let done = fraction >= 1.0;
    let end = if done { "\n" } else { "" };

    if let Err(e) = execute!(
        stdout(),
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line),
        Print(end)
    ) {
        debug!("Failed to draw progress bar: {e}");
    }
    LINE_OPEN.store(!done, Ordering::Relaxed);
}

/// Ends a progress line left open by a phase that stopped early, so the
/// next message starts on its own line. Returns whether a line was open.
pub fn interrupt() -> bool {
    let open = LINE_OPEN.swap(false, Ordering::Relaxed);
    if open {
        if let Err(e) = execute!(stdout(), Print("\n")) {
            debug!("Failed to end progress bar: {e}");
        }
    }
    open
}

fn render(fraction: f64) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = ((fraction * WIDTH as f64) as usize).min(WIDTH);
    format!(
        "{:.1}% [{}{}]",
        fraction * 100.0,
        "*".repeat(filled),
        "-".repeat(WIDTH - filled)
    )
}
