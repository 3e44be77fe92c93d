pub mod repo;

use std::fmt;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Book 레코드의 필드 목록 (저장 순서)
///
/// 저장소에 데이터가 없더라도 표의 헤더를 만들 수 있도록 정적으로 선언한다.
pub const BOOK_FIELDS: [&str; 6] = ["isbn", "title", "year", "published_by", "previous_edition", "price"];

/// Item 모듈에서 사용할 에러 열거
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    /// 필수 데이터가 입력 되지 않음
    #[error("Required argument missing: {0}")]
    RequireArgumentMissing(String),

    /// 알 수 없는 필드명
    #[error("Unknown field: {0}")]
    UnknownField(String),
}

/// 출판사
#[derive(Debug, Clone, PartialEq)]
pub struct Publisher {
    name: String,
    phone: String,
    city: Option<String>,
}

impl Publisher {
    pub fn new(name: &str, phone: &str, city: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            phone: phone.to_owned(),
            city: city.filter(|c| !c.is_empty()).map(|c| c.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }
}

/// 도서
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    isbn: String,
    title: String,
    year: i32,
    published_by: String,
    previous_edition: Option<String>,
    price: Option<f64>,
}

impl Book {
    pub fn builder() -> BookBuilder {
        BookBuilder::new()
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn published_by(&self) -> &str {
        &self.published_by
    }

    pub fn previous_edition(&self) -> Option<&str> {
        self.previous_edition.as_deref()
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    /// [`BOOK_FIELDS`]에 선언된 필드명으로 표에 출력할 값을 가져온다.
    /// 값이 없는 선택 필드는 빈 문자열로 반환된다.
    pub fn field_value(&self, field: &str) -> Result<String, ItemError> {
        let value = match field {
            "isbn" => self.isbn.clone(),
            "title" => self.title.clone(),
            "year" => self.year.to_string(),
            "published_by" => self.published_by.clone(),
            "previous_edition" => self.previous_edition.clone().unwrap_or_default(),
            "price" => self.price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
            _ => return Err(ItemError::UnknownField(field.to_owned())),
        };
        Ok(value)
    }

    /// 가격만 바꾼 도서
    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    pub fn to_builder(&self) -> BookBuilder {
        let mut builder = BookBuilder::new()
            .isbn(self.isbn.clone())
            .title(self.title.clone())
            .year(self.year)
            .published_by(self.published_by.clone());

        if let Some(previous_edition) = &self.previous_edition {
            builder = builder.previous_edition(previous_edition.clone());
        }

        if let Some(price) = self.price {
            builder = builder.price(price);
        }

        builder
    }
}

/// Book 빌더
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookBuilder {
    isbn: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    published_by: Option<String>,
    previous_edition: Option<String>,
    price: Option<f64>,
}

impl BookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isbn(mut self, isbn: String) -> Self {
        self.isbn = Some(isbn);
        self
    }

    pub fn title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn published_by(mut self, published_by: String) -> Self {
        self.published_by = Some(published_by);
        self
    }

    /// 빈 문자열은 이전 판이 없는 것으로 취급한다.
    pub fn previous_edition(mut self, previous_edition: String) -> Self {
        self.previous_edition = Some(previous_edition).filter(|p| !p.is_empty());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn build(self) -> Result<Book, ItemError> {
        let isbn = self.isbn.ok_or(ItemError::RequireArgumentMissing("isbn".to_owned()))?;
        let title = self.title.ok_or(ItemError::RequireArgumentMissing("title".to_owned()))?;
        let year = self.year.ok_or(ItemError::RequireArgumentMissing("year".to_owned()))?;
        let published_by = self.published_by
            .ok_or(ItemError::RequireArgumentMissing("published_by".to_owned()))?;

        Ok(Book {
            isbn,
            title,
            year,
            published_by,
            previous_edition: self.previous_edition,
            price: self.price,
        })
    }
}

/// 도서 부분 수정 폼
///
/// # Description
/// [`Some`]으로 설정된 필드만 저장소에 반영되며 [`None`]인 필드는 기존 값을 유지한다.
/// 가격 `0.0`처럼 "거짓"으로 보이는 값도 명시적으로 입력 되었다면 수정 대상이다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub published_by: Option<String>,
    pub previous_edition: Option<String>,
    pub price: Option<f64>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.year.is_none()
            && self.published_by.is_none()
            && self.previous_edition.is_none()
            && self.price.is_none()
    }
}

/// 도서 검색 조건
///
/// 문자열 조건은 모두 대소문자를 구분하지 않으며, 가격 범위는 양 끝을 포함한다.
#[derive(Debug, Clone, PartialEq)]
pub enum Search {
    All,

    /// 제목 부분 일치
    Title(String),

    /// ISBN 완전 일치
    Isbn(String),

    /// 출판사명 부분 일치
    Publisher(String),

    PriceRange { min: f64, max: f64 },

    Year(i32),

    /// 제목, 출판사명 부분 일치를 모두 만족
    TitleAndPublisher { title: String, publisher: String },
}

impl Display for Search {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Search::All => write!(f, "all books"),
            Search::Title(t) => write!(f, "title ~ \"{}\"", t),
            Search::Isbn(i) => write!(f, "isbn = \"{}\"", i),
            Search::Publisher(p) => write!(f, "publisher ~ \"{}\"", p),
            Search::PriceRange { min, max } => write!(f, "price in [{}, {}]", min, max),
            Search::Year(y) => write!(f, "year = {}", y),
            Search::TitleAndPublisher { title, publisher } => {
                write!(f, "title ~ \"{}\" and publisher ~ \"{}\"", title, publisher)
            }
        }
    }
}

/// 가격을 소수점 두 자리로 반올림한다.
///
/// 입력된 이진 부동소수 값의 정확한 십진 전개를 기준으로 반올림한다.
/// `19.995`의 실제 값은 19.99499...이므로 `19.99`, `9.999`는 `10.0`이 된다.
/// `price * 100.0`은 곱셈 과정에서 다시 반올림 되어(`1999.5`) 이 기준을 지킬 수 없고,
/// 아주 큰 값에서는 무한대가 되기 때문에 사용하지 않는다.
pub fn round_price(price: f64) -> f64 {
    format!("{:.2}", price).parse().unwrap_or(price)
}

/// 저장소 작업의 성공 결과
///
/// 작업은 성공했지만 아무것도 바꾸지 않은 경우를 경고로 구분한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done(String),

    /// 수정할 필드가 하나도 입력되지 않음
    NoOp(String),

    /// 조건에 해당하는 레코드가 없음
    NotFound(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Done(m) | Outcome::NoOp(m) | Outcome::NotFound(m) => m,
        }
    }

    pub fn is_warning(&self) -> bool {
        !matches!(self, Outcome::Done(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 저장소에 연결할 수 없음
    Connect,

    /// 유일 제약 조건 위반
    Duplicate,

    /// 저장소가 작업을 거부하거나 실패함
    Persistence,

    /// 저장된 데이터를 도메인 타입으로 변환할 수 없음
    Convert,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connect => write!(f, "connection error"),
            ErrorKind::Duplicate => write!(f, "duplicate key"),
            ErrorKind::Persistence => write!(f, "persistence error"),
            ErrorKind::Convert => write!(f, "convert error"),
        }
    }
}

/// 저장소 에러
///
/// 드라이버가 전달한 원본 메시지를 그대로 보관하며, 메시지를 파싱하지 않고 [`ErrorKind`]로 분류한다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connect, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 도서 관리 저장소
///
/// # Description
/// 도서와 출판사의 추가, 수정, 삭제, 검색을 제공한다.
/// 실제 저장 방식(문서형, 관계형)은 구현체가 결정하며 호출자는 이를 알 필요가 없다.
pub trait BookRepository {

    /// 출판사를 추가한다.
    fn add_publisher(&self, name: &str, phone: &str, city: Option<&str>) -> Result<Outcome, Error>;

    /// 도서를 추가한다. 가격은 [`round_price`]로 반올림 되어 저장된다.
    fn add_book(&self, book: &Book) -> Result<Outcome, Error>;

    /// ISBN으로 도서를 찾아 [`BookPatch`]에 입력된 필드만 수정한다.
    ///
    /// # Returns
    /// - 입력된 필드가 없으면 저장소를 호출하지 않고 [`Outcome::NoOp`]
    /// - ISBN에 해당하는 도서가 없으면 [`Outcome::NotFound`]
    fn edit_book(&self, isbn: &str, patch: &BookPatch) -> Result<Outcome, Error>;

    /// ISBN으로 도서를 삭제한다. 해당 도서가 없으면 [`Outcome::NotFound`]
    fn delete_book(&self, isbn: &str) -> Result<Outcome, Error>;

    /// 이름으로 출판사를 삭제한다. 출판사를 참조하는 도서는 삭제되지 않는다.
    fn delete_publisher(&self, name: &str) -> Result<Outcome, Error>;

    /// 검색 조건에 해당하는 도서를 ISBN 순으로 찾는다.
    fn search(&self, search: &Search) -> Result<Vec<Book>, Error>;

    /// 표의 헤더로 사용할 도서 필드명 목록
    fn field_names(&self) -> &'static [&'static str] {
        &BOOK_FIELDS
    }

    /// 저장소 연결을 종료한다.
    fn close(self: Box<Self>);

    fn search_all_books(&self) -> Result<Vec<Book>, Error> {
        self.search(&Search::All)
    }

    fn search_books_by_title(&self, title: &str) -> Result<Vec<Book>, Error> {
        self.search(&Search::Title(title.to_owned()))
    }

    fn search_books_by_isbn(&self, isbn: &str) -> Result<Vec<Book>, Error> {
        self.search(&Search::Isbn(isbn.to_owned()))
    }

    fn search_books_by_publisher(&self, publisher: &str) -> Result<Vec<Book>, Error> {
        self.search(&Search::Publisher(publisher.to_owned()))
    }

    fn search_books_by_price_range(&self, min: f64, max: f64) -> Result<Vec<Book>, Error> {
        self.search(&Search::PriceRange { min, max })
    }

    fn search_books_by_year(&self, year: i32) -> Result<Vec<Book>, Error> {
        self.search(&Search::Year(year))
    }

    fn search_books_by_title_and_publisher(&self, title: &str, publisher: &str) -> Result<Vec<Book>, Error> {
        self.search(&Search::TitleAndPublisher {
            title: title.to_owned(),
            publisher: publisher.to_owned(),
        })
    }
}
