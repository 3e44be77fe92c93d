use crossterm::style::{Attribute, Color, ContentStyle};

/// 터미널 폭을 알 수 없을 때 사용할 기본 폭
pub const DEFAULT_WIDTH: usize = 100;

/// 메시지 스타일
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Underline,
    Bold,

    /// 제목, 배너
    Main,
    Info,
    Warning,
    Error,
}

pub fn underline(message: &str) -> String {
    styled(message, &[Style::Underline])
}

pub fn bold(message: &str) -> String {
    styled(message, &[Style::Bold])
}

pub fn main(message: &str) -> String {
    styled(message, &[Style::Main])
}

pub fn info(message: &str) -> String {
    styled(message, &[Style::Info])
}

pub fn warning(message: &str) -> String {
    styled(message, &[Style::Warning])
}

pub fn error(message: &str) -> String {
    styled(message, &[Style::Error])
}

/// 여러 스타일을 한번에 적용한다. 색상이 여러개 지정되면 마지막 색상이 적용된다.
pub fn styled(message: &str, styles: &[Style]) -> String {
    let mut style = ContentStyle::new();

    for s in styles {
        match s {
            Style::Underline => style.attributes.set(Attribute::Underlined),
            Style::Bold => style.attributes.set(Attribute::Bold),
            Style::Main => style.foreground_color = Some(Color::Magenta),
            Style::Info => style.foreground_color = Some(Color::Blue),
            Style::Warning => style.foreground_color = Some(Color::Yellow),
            Style::Error => style.foreground_color = Some(Color::Red),
        }
    }

    style.apply(message).to_string()
}

/// 현재 터미널의 폭. 터미널이 아닌 경우 [`DEFAULT_WIDTH`]
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(columns, _)| columns as usize)
        .unwrap_or(DEFAULT_WIDTH)
}
