use crate::configs::PgPool;
use crate::item::repo::Store;
use crate::item::{Book, BookPatch, Error, ErrorKind, ItemError, Publisher, Search};
use diesel::connection::SimpleConnection;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, info};

mod schema;

/// 테이블과 검색용 인덱스를 생성한다. 모든 구문은 이미 존재하면 무시된다.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS book (
    isbn VARCHAR(17) PRIMARY KEY,
    title VARCHAR(256) NOT NULL,
    year INTEGER NOT NULL,
    published_by VARCHAR(128) NOT NULL,
    previous_edition VARCHAR(17),
    price DOUBLE PRECISION
);
CREATE TABLE IF NOT EXISTS publisher (
    name VARCHAR(128) PRIMARY KEY,
    phone VARCHAR(32) NOT NULL,
    city VARCHAR(128)
);
CREATE INDEX IF NOT EXISTS book_title_idx ON book (title);
CREATE INDEX IF NOT EXISTS book_published_by_idx ON book (published_by);
CREATE INDEX IF NOT EXISTS book_price_idx ON book (price);
CREATE INDEX IF NOT EXISTS book_year_idx ON book (year);
"#;

type BookQuery = schema::book::BoxedQuery<'static, Pg>;

#[derive(Queryable)]
pub struct BookEntity {
    pub isbn: String,
    pub title: String,
    pub year: i32,
    pub published_by: String,
    pub previous_edition: Option<String>,
    pub price: Option<f64>,
}

impl BookEntity {
    pub fn to_domain(self) -> Result<Book, ItemError> {
        let mut builder = Book::builder()
            .isbn(self.isbn)
            .title(self.title)
            .year(self.year)
            .published_by(self.published_by);

        if let Some(previous_edition) = self.previous_edition {
            builder = builder.previous_edition(previous_edition);
        }

        if let Some(price) = self.price {
            builder = builder.price(price);
        }

        builder.build()
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::book)]
pub struct NewBook<'a> {
    pub isbn: &'a str,
    pub title: &'a str,
    pub year: i32,
    pub published_by: &'a str,
    pub previous_edition: Option<&'a str>,
    pub price: Option<f64>,
}

impl <'a, 'b> NewBook<'a> where 'b: 'a {
    pub fn from(book: &'b Book) -> Self {
        Self {
            isbn: book.isbn(),
            title: book.title(),
            year: book.year(),
            published_by: book.published_by(),
            previous_edition: book.previous_edition(),
            price: book.price(),
        }
    }
}

/// 부분 수정 폼으로 [`None`]인 필드는 UPDATE 구문에서 제외된다.
#[derive(AsChangeset)]
#[diesel(table_name = schema::book)]
pub struct BookForm<'a> {
    pub title: Option<&'a str>,
    pub year: Option<i32>,
    pub published_by: Option<&'a str>,
    pub previous_edition: Option<&'a str>,
    pub price: Option<f64>,
}

impl <'a, 'b> BookForm<'a> where 'b: 'a {
    pub fn from(patch: &'b BookPatch) -> Self {
        Self {
            title: patch.title.as_deref(),
            year: patch.year,
            published_by: patch.published_by.as_deref(),
            previous_edition: patch.previous_edition.as_deref(),
            price: patch.price,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = schema::publisher)]
pub struct NewPublisher<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub city: Option<&'a str>,
}

impl <'a, 'b> NewPublisher<'a> where 'b: 'a {
    pub fn from(publisher: &'b Publisher) -> Self {
        Self {
            name: publisher.name(),
            phone: publisher.phone(),
            city: publisher.city(),
        }
    }
}

/// 관계형 저장소 (PostgreSQL)
pub struct PgStore {
    pool: PgPool
}

impl PgStore {

    /// 스키마를 준비하고 저장소를 연다.
    pub fn open(pool: PgPool) -> Result<Self, Error> {
        let mut connection = pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        connection.batch_execute(SCHEMA_SQL)
            .map_err(|e| Error::connect(e.to_string()))?;

        info!("PostgreSQL store opened");
        Ok(Self { pool })
    }
}

impl Store for PgStore {
    fn insert_publisher(&self, publisher: &Publisher) -> Result<(), Error> {
        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        diesel::insert_into(schema::publisher::table)
            .values(NewPublisher::from(publisher))
            .execute(&mut connection)
            .map_err(to_error)?;

        Ok(())
    }

    fn insert_book(&self, book: &Book) -> Result<(), Error> {
        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        diesel::insert_into(schema::book::table)
            .values(NewBook::from(book))
            .execute(&mut connection)
            .map_err(to_error)?;

        Ok(())
    }

    fn update_book(&self, isbn: &str, patch: &BookPatch) -> Result<usize, Error> {
        use schema::book;

        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        let updated_count = diesel::update(book::table.filter(book::isbn.eq(isbn)))
            .set(BookForm::from(patch))
            .execute(&mut connection)
            .map_err(to_error)?;

        Ok(updated_count)
    }

    fn delete_book(&self, isbn: &str) -> Result<usize, Error> {
        use schema::book;

        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        let deleted_count = diesel::delete(book::table.filter(book::isbn.eq(isbn)))
            .execute(&mut connection)
            .map_err(to_error)?;

        Ok(deleted_count)
    }

    fn delete_publisher(&self, name: &str) -> Result<usize, Error> {
        use schema::publisher;

        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        let deleted_count = diesel::delete(publisher::table.filter(publisher::name.eq(name)))
            .execute(&mut connection)
            .map_err(to_error)?;

        Ok(deleted_count)
    }

    fn find(&self, search: &Search) -> Result<Vec<Book>, Error> {
        let mut connection = self.pool.get()
            .map_err(|e| Error::connect(e.to_string()))?;

        let query = to_query(search);
        debug!("find books: {}", diesel::debug_query::<Pg, _>(&query));

        let results = query
            .load::<BookEntity>(&mut connection)
            .map_err(to_error)?;

        results.into_iter()
            .map(|e| e.to_domain().map_err(|e| Error::new(ErrorKind::Convert, e.to_string())))
            .collect()
    }

    fn close(self: Box<Self>) {
        let state = self.pool.state();
        drop(self.pool);
        info!("PostgreSQL store closed ({} connections released)", state.connections);
    }
}

/// 검색 조건을 SELECT 구문으로 변환한다.
fn to_query(search: &Search) -> BookQuery {
    use schema::book;

    let query = book::table
        .order_by(book::isbn.asc())
        .into_boxed();

    match search {
        Search::All => query,
        Search::Title(title) => query.filter(book::title.ilike(contains_pattern(title))),
        Search::Isbn(isbn) => query.filter(book::isbn.ilike(escape_like(isbn))),
        Search::Publisher(publisher) => query.filter(book::published_by.ilike(contains_pattern(publisher))),
        Search::PriceRange { min, max } => query.filter(book::price.between(*min, *max)),
        Search::Year(year) => query.filter(book::year.eq(*year)),
        Search::TitleAndPublisher { title, publisher } => query
            .filter(book::title.ilike(contains_pattern(title)))
            .filter(book::published_by.ilike(contains_pattern(publisher))),
    }
}

fn contains_pattern(s: &str) -> String {
    format!("%{}%", escape_like(s))
}

/// LIKE 패턴의 와일드카드를 이스케이프 한다. (PostgreSQL 기본 이스케이프 문자 `\`)
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_error(e: DieselError) -> Error {
    let kind = match &e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => ErrorKind::Duplicate,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => ErrorKind::Connect,
        _ => ErrorKind::Persistence,
    };

    Error::new(kind, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql(search: &Search) -> String {
        diesel::debug_query::<Pg, _>(&to_query(search)).to_string()
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), r"50\%\_off\\");
        assert_eq!(contains_pattern("dune"), "%dune%");
    }

    #[test]
    fn title_search_is_case_insensitive_substring() {
        let sql = sql(&Search::Title("dune".to_owned()));

        assert!(sql.contains(r#""book"."title" ILIKE $1"#), "{}", sql);
        assert!(sql.contains(r#"["%dune%"]"#), "{}", sql);
        assert!(sql.contains(r#"ORDER BY "book"."isbn" ASC"#), "{}", sql);
    }

    #[test]
    fn isbn_search_has_no_wildcards() {
        let sql = sql(&Search::Isbn("044101359x".to_owned()));

        assert!(sql.contains(r#""book"."isbn" ILIKE $1"#), "{}", sql);
        assert!(sql.contains(r#"["044101359x"]"#), "{}", sql);
    }

    #[test]
    fn price_range_uses_inclusive_between() {
        let sql = sql(&Search::PriceRange { min: 9.99, max: 20.0 });

        assert!(sql.contains(r#""book"."price" BETWEEN $1 AND $2"#), "{}", sql);
    }

    #[test]
    fn title_and_publisher_are_combined() {
        let sql = sql(&Search::TitleAndPublisher {
            title: "dune".to_owned(),
            publisher: "ace".to_owned(),
        });

        assert!(sql.contains(r#""book"."title" ILIKE $1"#), "{}", sql);
        assert!(sql.contains(r#""book"."published_by" ILIKE $2"#), "{}", sql);
        assert!(sql.contains(" AND "), "{}", sql);
    }

    #[test]
    fn all_and_year_searches() {
        let all = sql(&Search::All);
        assert!(!all.contains("WHERE"), "{}", all);

        let year = sql(&Search::Year(1990));
        assert!(year.contains(r#""book"."year" = $1"#), "{}", year);
        assert!(year.contains("[1990]"), "{}", year);
    }
}
