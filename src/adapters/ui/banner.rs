//! Startup banner: figlet title shaded from amber to teal, then the version line.

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{self, Write};
use tracing::debug;

const TITLE: &str = "TG-HERALD";

const AMBER: (u8, u8, u8) = (0xff, 0xb3, 0x00);
const TEAL: (u8, u8, u8) = (0x00, 0xb8, 0xa9);

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb { r, g, b }
}

/// Color of banner row `row` out of `rows`; first row is amber, last is teal.
fn shade(row: usize, rows: usize) -> Color {
    if rows <= 1 {
        return rgb(TEAL);
    }
    let mix = |from: u8, to: u8| -> u8 {
        let span = i32::from(to) - i32::from(from);
        (i32::from(from) + span * row as i32 / (rows as i32 - 1)) as u8
    };
    rgb((mix(AMBER.0, TEAL.0), mix(AMBER.1, TEAL.1), mix(AMBER.2, TEAL.2)))
}

/// Figlet rendition of the title; the bare title when the font cannot render it.
fn banner_art() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(TITLE).map(|figure| figure.to_string()))
        .unwrap_or_else(|| TITLE.to_string())
}

/// Queue the whole banner on `out` and flush once.
pub fn write_banner<W: Write>(out: &mut W) -> io::Result<()> {
    let art = banner_art();
    let rows: Vec<&str> = art.lines().filter(|l| !l.trim().is_empty()).collect();
    for (i, row) in rows.iter().enumerate() {
        queue!(
            out,
            SetForegroundColor(shade(i, rows.len())),
            Print(row),
            Print("\r\n")
        )?;
    }
    queue!(
        out,
        SetForegroundColor(rgb(TEAL)),
        Print(format!(
            "v{}  GitHub -> Telegram notifications\r\n",
            env!("CARGO_PKG_VERSION")
        )),
        ResetColor
    )?;
    out.flush()
}

pub fn print_welcome() {
    if let Err(e) = write_banner(&mut io::stdout()) {
        debug!(error = %e, "banner not printed");
    }
}
