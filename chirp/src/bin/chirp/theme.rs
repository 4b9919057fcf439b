use colored::Color;
use comfy_table::Color as TableColor;
use once_cell::sync::Lazy;

/// Terminal colors. Messages are painted with `colored`, the feed table with `comfy-table`.
pub struct Palette {
    pub done: Color,
    pub failed: Color,
    pub caution: Color,
    pub note: Color,
    pub accent: Color,
    pub dim: Color,
    pub title: Color,
    pub step: Color,
    pub key: Color,
    pub value: Color,
    pub table_header: TableColor,
    pub author: TableColor,
}

pub static THEME: Lazy<Palette> = Lazy::new(|| Palette {
    done: Color::Green,
    failed: Color::Red,
    caution: Color::Yellow,
    note: Color::Blue,
    accent: Color::Cyan,
    dim: Color::BrightBlack,
    title: Color::BrightBlue,
    step: Color::Magenta,
    key: Color::BrightCyan,
    value: Color::White,
    table_header: TableColor::Cyan,
    author: TableColor::Green,
});

pub struct Glyphs {
    pub done: &'static str,
    pub failed: &'static str,
    pub caution: &'static str,
    pub note: &'static str,
    pub arrow: &'static str,
    pub bullet: &'static str,
    pub spinner: &'static str,
    /// Marks a post whose text was changed after publishing.
    pub edited: &'static str,
    pub photo: &'static str,
}

pub const ICONS: Glyphs = Glyphs {
    done: "✔",
    failed: "✘",
    caution: "!",
    note: "·",
    arrow: "›",
    bullet: "-",
    spinner: "…",
    edited: "✎",
    photo: "▣",
};
