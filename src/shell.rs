pub mod input;
pub mod stdin;
pub mod table;

use crate::format::{self, Style};
use crate::item::{Book, BookPatch, BookRepository, Error, Outcome, Search};
use crate::shell::input::ValidationError;
use std::io;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

const WELCOME: &str = "BOOK MANAGER";
const GOODBYE: &str = "THANK YOU FOR USING BOOK MANAGER";
const BACK: &str = "<";

/// 출판사 삭제 메뉴는 목록에 표시하지 않는다.
const HIDDEN_DELETE_PUBLISHER: usize = 69;

const MENU_OPTIONS: [&str; 6] = [
    "Add a new publisher",
    "Add a new book",
    "Edit an existing book",
    "Delete a book",
    "Search books",
    "Exit",
];

const SEARCH_MENU_OPTIONS: [&str; 7] = [
    "Search all books",
    "Search by title",
    "Search by isbn",
    "Search by publisher",
    "Search by price range",
    "Search by year",
    "Search by title and publisher",
];

#[derive(Debug, Error)]
pub enum ShellError {
    /// 입력이 종료됨 (EOF, 터미널 종료, SIGINT)
    #[error("input closed")]
    Interrupted,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// 메뉴, 배너를 출력할 폭
    pub width: usize,

    /// 검색 결과 표의 열 너비를 터미널 폭에 맞게 조정할지 여부
    pub adaptive_table: bool,
}

/// 줄 단위 대화형 셸
///
/// # Description
/// 메뉴를 출력하고 필드 값을 하나씩 입력 받아 검증한 뒤 [`BookRepository`]에 위임한다.
/// 입력 검증 에러([`ValidationError`])는 이 계층에서만 처리되며 저장소로 전달되지 않는다.
pub struct Shell<'a, R, W>
where
    R: BufRead,
    W: Write
{
    repository: &'a dyn BookRepository,
    input: R,
    output: W,
    options: Options,
}

impl<'a, R, W> Shell<'a, R, W>
where
    R: BufRead,
    W: Write
{
    pub fn new(repository: &'a dyn BookRepository, input: R, output: W, options: Options) -> Self {
        Self { repository, input, output, options }
    }

    /// 종료 메뉴를 선택하거나 입력이 끝날 때까지 메뉴를 반복한다.
    ///
    /// 입력이 끝나거나 인터럽트 된 경우에도 정상 종료로 처리하며 중단 배너를 출력한다.
    /// 인터럽트를 입력 종료로 바꾸는 입력은 [`stdin::InterruptibleInput`]을 참고
    pub fn run(&mut self) -> Result<(), ShellError> {
        self.banner(WELCOME, true)?;

        match self.run_loop() {
            Ok(()) => self.banner(GOODBYE, false),
            Err(ShellError::Interrupted) => {
                warn!("Input closed or interrupted, shutting down");
                self.banner(&format!("INTERRUPTED: {}", GOODBYE), false)
            }
            Err(e) => Err(e),
        }
    }

    fn run_loop(&mut self) -> Result<(), ShellError> {
        loop {
            self.print_menu()?;

            let line = self.read_line(&format::info("Please select a function, type [1 - 6] and press enter: "))?;
            let option = match input::option(&input::normalize(&line), MENU_OPTIONS.len()) {
                Ok(option) => option,
                Err(e) => {
                    self.print_error(&e.to_string())?;
                    continue;
                }
            };

            match option {
                1 => self.add_publisher()?,
                2 => self.add_book()?,
                3 => self.edit_book()?,
                4 => self.delete_book()?,
                5 => self.search_books()?,
                6 => return Ok(()),
                HIDDEN_DELETE_PUBLISHER => self.delete_publisher()?,
                _ => self.print_error(&ValidationError::InvalidOption(MENU_OPTIONS.len()).to_string())?,
            }
        }
    }

    fn add_publisher(&mut self) -> Result<(), ShellError> {
        self.print(&format::main("\nAdd a new publisher"))?;

        let Some(name) = self.ask("Publisher name", true, |s| input::required("Publisher name", s))? else {
            return Ok(());
        };
        let Some(phone) = self.ask("Publisher phone", true, |s| input::digits("Publisher phone", s))? else {
            return Ok(());
        };
        let Some(city) = self.ask("Publisher city", true, |s| Ok(s.to_owned()))? else {
            return Ok(());
        };

        let city = Some(city.as_str()).filter(|c| !c.is_empty());
        let result = self.repository.add_publisher(&name, &phone, city);
        self.report(result)
    }

    fn add_book(&mut self) -> Result<(), ShellError> {
        self.print(&format::main("\nAdd a new book"))?;

        let Some(isbn) = self.ask("Book ISBN", true, |s| input::isbn("Book ISBN", s))? else {
            return Ok(());
        };
        let Some(title) = self.ask("Book title", true, |s| input::required("Book title", s))? else {
            return Ok(());
        };
        let Some(year) = self.ask("Book year", true, |s| input::year("Book year", s))? else {
            return Ok(());
        };
        let Some(published_by) = self.ask("Book publisher", true, |s| input::required("Book publisher", s))? else {
            return Ok(());
        };
        let Some(previous_edition) = self.ask("Book previous edition", true, |s| input::optional_isbn("Book previous edition", s))? else {
            return Ok(());
        };
        let Some(price) = self.ask("Book price", true, |s| input::optional_price("Book price", s))? else {
            return Ok(());
        };

        let mut builder = Book::builder()
            .isbn(isbn)
            .title(title)
            .year(year)
            .published_by(published_by);

        if let Some(previous_edition) = previous_edition {
            builder = builder.previous_edition(previous_edition);
        }

        if let Some(price) = price {
            builder = builder.price(price);
        }

        match builder.build() {
            Ok(book) => {
                let result = self.repository.add_book(&book);
                self.report(result)
            }
            Err(e) => self.print_error(&e.to_string()),
        }
    }

    fn edit_book(&mut self) -> Result<(), ShellError> {
        self.print(&format::main("\nEdit an existing book"))?;

        let Some(isbn) = self.ask("Book ISBN", true, |s| input::isbn("Book ISBN", s))? else {
            return Ok(());
        };

        let mut patch = BookPatch::default();

        if self.confirm("Change title? [y/n]: ")? {
            patch.title = self.ask("Book title", false, |s| input::required("Book title", s))?;
        }

        if self.confirm("Change year? [y/n]: ")? {
            patch.year = self.ask("Book year", false, |s| input::year("Book year", s))?;
        }

        if self.confirm("Change publisher? [y/n]: ")? {
            patch.published_by = self.ask("Book publisher", false, |s| input::required("Book publisher", s))?;
        }

        if self.confirm("Change previous edition? [y/n]: ")? {
            patch.previous_edition = self.ask("Book previous edition", false, |s| input::optional_isbn("Book previous edition", s))?
                .flatten();
        }

        if self.confirm("Change price? [y/n]: ")? {
            patch.price = self.ask("Book price", false, |s| input::price("Book price", s))?;
        }

        let result = self.repository.edit_book(&isbn, &patch);
        self.report(result)
    }

    fn delete_book(&mut self) -> Result<(), ShellError> {
        self.print(&format::main("\nDelete a book"))?;

        let Some(isbn) = self.ask("Book ISBN", true, |s| input::isbn("Book ISBN", s))? else {
            return Ok(());
        };

        let result = self.repository.delete_book(&isbn);
        self.report(result)
    }

    fn delete_publisher(&mut self) -> Result<(), ShellError> {
        self.print(&format::main("\nHidden: Delete a publisher"))?;

        let Some(name) = self.ask("Publisher name", true, |s| input::required("Publisher name", s))? else {
            return Ok(());
        };

        let result = self.repository.delete_publisher(&name);
        self.report(result)
    }

    fn search_books(&mut self) -> Result<(), ShellError> {
        self.print_search_menu()?;

        let max = SEARCH_MENU_OPTIONS.len();
        let option = self.ask("\nSearch by", true, |s| {
            input::option(s, max).and_then(|o| {
                if (1..=max).contains(&o) { Ok(o) } else { Err(ValidationError::InvalidOption(max)) }
            })
        })?;
        let Some(option) = option else {
            return Ok(());
        };

        let search = match option {
            1 => Some(Search::All),
            2 => self.ask("Book title", false, |s| input::required("Book title", s))?
                .map(Search::Title),
            3 => self.ask("Book ISBN", false, |s| input::isbn("Book ISBN", s))?
                .map(Search::Isbn),
            4 => self.ask("Book publisher", false, |s| input::required("Book publisher", s))?
                .map(Search::Publisher),
            5 => {
                let min = self.ask("Minimum price", false, |s| input::price("Minimum price", s))?;
                let max = self.ask("Maximum price", false, |s| input::price("Maximum price", s))?;
                min.zip(max).map(|(min, max)| Search::PriceRange { min, max })
            }
            6 => self.ask("Book year", false, |s| input::year("Book year", s))?
                .map(Search::Year),
            _ => {
                let title = self.ask("Book title", false, |s| input::required("Book title", s))?;
                let publisher = self.ask("Book publisher", false, |s| input::required("Book publisher", s))?;
                title.zip(publisher).map(|(title, publisher)| Search::TitleAndPublisher { title, publisher })
            }
        };
        let Some(search) = search else {
            return Ok(());
        };

        self.print(&format!("\nSearching {}", search))?;
        info!("Search books: {}", search);

        match self.repository.search(&search) {
            Ok(books) if books.is_empty() => self.print(&format::styled("\nNo results found.", &[Style::Bold, Style::Info])),
            Ok(books) => self.print_books(&books),
            Err(e) => self.print_failure(&e),
        }
    }

    fn print_books(&mut self, books: &[Book]) -> Result<(), ShellError> {
        self.print(&format::styled("\nSearch results:", &[Style::Bold, Style::Info]))?;

        let lines = table::render(self.repository.field_names(), books, self.options.width, self.options.adaptive_table);
        match lines {
            Ok(lines) => {
                for line in lines {
                    self.print(&line)?;
                }
                Ok(())
            }
            Err(e) => self.print_error(&e.to_string()),
        }
    }

    /// 값을 입력 받는다. 검증에 실패하면 에러를 출력하고 다시 입력 받는다.
    ///
    /// # Returns
    /// `allow_back`이 설정된 상태에서 `<`가 입력되면 [`None`]
    fn ask<T, F>(&mut self, label: &str, allow_back: bool, parse: F) -> Result<Option<T>, ShellError>
    where
        F: Fn(&str) -> Result<T, ValidationError>
    {
        let prompt = if allow_back {
            format!("{} (\"{}\" to go back): ", label, BACK)
        } else {
            format!("{}: ", label)
        };

        loop {
            let value = input::normalize(&self.read_line(&prompt)?);
            if allow_back && value == BACK {
                return Ok(None);
            }

            match parse(&value) {
                Ok(v) => return Ok(Some(v)),
                Err(e) => self.print_error(&e.to_string())?,
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, ShellError> {
        let answer = self.read_line(prompt)?;
        Ok(input::is_yes(&answer))
    }

    fn read_line(&mut self, prompt: &str) -> Result<String, ShellError> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ShellError::Interrupted);
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    fn report(&mut self, result: Result<Outcome, Error>) -> Result<(), ShellError> {
        match result {
            Ok(outcome) if outcome.is_warning() => self.print(&format!("\n{}", format::warning(outcome.message()))),
            Ok(outcome) => self.print(&format!("\n{}", format::info(outcome.message()))),
            Err(e) => self.print_failure(&e),
        }
    }

    fn print_failure(&mut self, e: &Error) -> Result<(), ShellError> {
        self.print_error(&format!("\n{}", e))
    }

    fn print_error(&mut self, message: &str) -> Result<(), ShellError> {
        self.print(&format::styled(message, &[Style::Bold, Style::Error]))
    }

    fn print(&mut self, message: &str) -> Result<(), ShellError> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn print_menu(&mut self) -> Result<(), ShellError> {
        let width = self.options.width;
        let title = "Menu Options";

        self.print(&format!("\n{}", "-".repeat(width)))?;
        self.print(&format!("{}{}", " ".repeat(width.saturating_sub(title.len()) / 2), format::styled(title, &[Style::Underline, Style::Info])))?;
        for line in wrap_options(&MENU_OPTIONS, width) {
            self.print(&format!("{:^width$}", line, width = width))?;
        }
        Ok(())
    }

    fn print_search_menu(&mut self) -> Result<(), ShellError> {
        self.print(&format!("\n{}", format::styled("Search Menu Options", &[Style::Underline, Style::Info])))?;
        for line in wrap_options(&SEARCH_MENU_OPTIONS, self.options.width) {
            self.print(&line)?;
        }
        Ok(())
    }

    fn banner(&mut self, text: &str, opening: bool) -> Result<(), ShellError> {
        let width = self.options.width;
        let stars = "*".repeat(width);
        let title = format!("{:-^width$}", text, width = width);

        let banner = if opening {
            format!("\n\n{}\n{}", stars, title)
        } else {
            format!("\n\n{}\n{}\n", title, stars)
        };
        self.print(&format::styled(&banner, &[Style::Bold, Style::Main]))
    }
}

/// `n. 옵션` 항목들을 폭을 넘지 않도록 여러 줄로 나눈다.
fn wrap_options(options: &[&str], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for (i, option) in options.iter().enumerate() {
        let item = format!("{}. {}", i + 1, option);
        if !current.is_empty() && current.len() + 4 + item.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("    ");
        }
        current.push_str(&item);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
