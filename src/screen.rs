use crossterm::{
    cursor, execute, queue,
    style::{Print, ResetColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Raw-mode alternate screen that shows a block of status lines.
pub(crate) struct Screen {
    out: io::Stdout,
    prev: Vec<String>,
}

impl Screen {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;
        Ok(Self {
            out,
            prev: Vec::new(),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Redraws only the lines that changed since the last frame.
    pub(crate) fn present(&mut self, lines: &[String]) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let rows = lines.len().max(self.prev.len());
        for y in 0..rows {
            let line = lines.get(y).map(String::as_str).unwrap_or("");
            if self.prev.get(y).map(String::as_str) == Some(line) {
                continue;
            }
            let row = u16::try_from(y).unwrap_or(u16::MAX);
            queue!(
                self.out,
                cursor::MoveTo(0, row),
                Clear(ClearType::CurrentLine),
                Print(line)
            )?;
        }
        queue!(self.out, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev = lines.to_vec();
        Ok(())
    }
}

pub(crate) fn bar(value: i32, width: usize) -> String {
    let v = value.clamp(0, 100) as usize;
    let fill = (v * width + 50) / 100;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < fill { '█' } else { ' ' });
    }
    s.push(']');
    s
}
