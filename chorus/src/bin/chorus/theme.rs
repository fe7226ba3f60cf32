use colored::Color;

/// Colour roles shared by help text and command output.
pub struct Palette {
    pub ok: Color,
    pub failure: Color,
    pub caution: Color,
    pub note: Color,
    pub accent: Color,
    pub faint: Color,
    pub title: Color,
    pub command: Color,
    pub label: Color,
    pub text: Color,
}

pub const THEME: Palette = Palette {
    ok: Color::Green,
    failure: Color::Red,
    caution: Color::Yellow,
    note: Color::Blue,
    accent: Color::Cyan,
    faint: Color::BrightBlack,
    title: Color::BrightBlue,
    command: Color::Magenta,
    label: Color::BrightCyan,
    text: Color::White,
};

/// Status glyphs prefixed to output lines.
pub struct Glyphs {
    pub ok: &'static str,
    pub failure: &'static str,
    pub caution: &'static str,
    pub note: &'static str,
    pub arrow: &'static str,
    pub pending: &'static str,
}

pub const ICONS: Glyphs = Glyphs {
    ok: "✓",
    failure: "✗",
    caution: "⚠",
    note: "ℹ",
    arrow: "→",
    pending: "⟳",
};
