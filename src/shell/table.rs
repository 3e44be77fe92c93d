use crate::format::{self, Style};
use crate::item::{Book, ItemError};

const SEPARATOR: &str = " | ";

/// 도서 목록을 표 형태의 줄 목록으로 만든다.
///
/// 열 너비는 헤더와 데이터 중 가장 긴 값으로 정해지며,
/// `adaptive`가 설정된 경우 전체 폭(`width`)에 맞게 비율로 조정된다.
pub fn render(fields: &[&str], books: &[Book], width: usize, adaptive: bool) -> Result<Vec<String>, ItemError> {
    let headers = fields.iter()
        .map(|f| capitalize(f))
        .collect::<Vec<_>>();

    let rows = books.iter()
        .map(|b| fields.iter().map(|f| b.field_value(f)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut widths = headers.iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect::<Vec<_>>();

    if adaptive && !widths.is_empty() {
        let total = widths.iter().sum::<usize>() + widths.len() * SEPARATOR.len() - 1;
        widths = widths.iter()
            .map(|w| ((*w as f64 / total as f64) * width as f64).round() as usize)
            .collect();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format::styled(&join(&headers, &widths), &[Style::Bold, Style::Main]));
    for row in rows {
        lines.push(join(&row, &widths));
    }

    Ok(lines)
}

fn join(cells: &[String], widths: &[usize]) -> String {
    cells.iter()
        .zip(widths)
        .map(|(cell, w)| format!("{:^w$}", cell, w = *w))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::BOOK_FIELDS;

    fn book() -> Book {
        Book::builder()
            .isbn("111".to_owned())
            .title("Foo".to_owned())
            .year(1990)
            .published_by("Ace".to_owned())
            .price(10.0)
            .build()
            .unwrap()
    }

    #[test]
    fn capitalizes_headers() {
        assert_eq!(capitalize("published_by"), "Published_by");
        assert_eq!(capitalize("ISBN"), "Isbn");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn columns_fit_the_widest_value() {
        let lines = render(&BOOK_FIELDS, &[book()], 100, false).unwrap();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Published_by"));
        let blank = " ".repeat(16);
        assert_eq!(lines[1], ["111 ", " Foo ", "1990", "    Ace     ", blank.as_str(), "10.00"].join(" | "));
    }

    #[test]
    fn adaptive_widths_scale_to_the_terminal() {
        let lines = render(&["isbn", "title"], &[book()], 22, true).unwrap();

        // 4 + 5 + separators => 14 columns, scaled to 22 => 6 and 8
        assert_eq!(lines[1], [" 111  ", "  Foo   "].join(" | "));
    }
}
