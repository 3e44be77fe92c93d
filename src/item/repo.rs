use crate::configs::{self, AppConfig, Backend};
use crate::item::repo::diesel::PgStore;
use crate::item::repo::mongo::MongoStore;
use crate::item::{round_price, Book, BookPatch, BookRepository, Error, Outcome, Publisher, Search};
use std::fmt::Debug;
use tracing::{error, info};

pub mod diesel;
pub mod mongo;

/// 저장소 백엔드가 제공해야 하는 기본 연산
///
/// # Description
/// 수정, 삭제 연산은 조건에 일치한 레코드 수를 반환한다.
/// 존재 여부 판단은 이 값으로만 하며 별도의 사전 조회는 하지 않는다.
pub trait Store {
    fn insert_publisher(&self, publisher: &Publisher) -> Result<(), Error>;

    fn insert_book(&self, book: &Book) -> Result<(), Error>;

    /// 일치한 레코드 수를 반환한다. (변경 여부와 무관)
    fn update_book(&self, isbn: &str, patch: &BookPatch) -> Result<usize, Error>;

    fn delete_book(&self, isbn: &str) -> Result<usize, Error>;

    fn delete_publisher(&self, name: &str) -> Result<usize, Error>;

    fn find(&self, search: &Search) -> Result<Vec<Book>, Error>;

    /// 연결을 종료한다. 이후에는 저장소를 사용할 수 없다.
    fn close(self: Box<Self>);
}

/// [`Store`] 위에서 동작하는 [`BookRepository`] 구현
///
/// 가격 반올림, 빈 수정 요청 처리, 결과 메시지 생성처럼 백엔드와 무관한 규칙을 담당한다.
pub struct StoreRepository {
    store: Box<dyn Store>,
}

impl StoreRepository {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self { store }
    }
}

impl BookRepository for StoreRepository {
    fn add_publisher(&self, name: &str, phone: &str, city: Option<&str>) -> Result<Outcome, Error> {
        let publisher = Publisher::new(name, phone, city);

        self.store.insert_publisher(&publisher)
            .inspect_err(logging_error)?;

        info!("Publisher added: {}", name);
        Ok(Outcome::Done(format!("Publisher {} added successfully.", name)))
    }

    fn add_book(&self, book: &Book) -> Result<Outcome, Error> {
        let book = book.clone().with_price(book.price().map(round_price));

        self.store.insert_book(&book)
            .inspect_err(logging_error)?;

        info!("Book added: {} ({})", book.isbn(), book.title());
        Ok(Outcome::Done(format!("Book {} added successfully.", book.title())))
    }

    fn edit_book(&self, isbn: &str, patch: &BookPatch) -> Result<Outcome, Error> {
        if patch.is_empty() {
            return Ok(Outcome::NoOp("No changes were made.".to_owned()));
        }

        let patch = BookPatch {
            price: patch.price.map(round_price),
            ..patch.clone()
        };

        let matched = self.store.update_book(isbn, &patch)
            .inspect_err(logging_error)?;

        if matched == 0 {
            return Ok(Outcome::NotFound(format!("Book {} not found.", isbn)));
        }

        info!("Book edited: {} {:?}", isbn, patch);
        Ok(Outcome::Done(format!("Book {} edited successfully.", isbn)))
    }

    fn delete_book(&self, isbn: &str) -> Result<Outcome, Error> {
        let deleted = self.store.delete_book(isbn)
            .inspect_err(logging_error)?;

        if deleted == 0 {
            return Ok(Outcome::NotFound(format!("Book {} not found.", isbn)));
        }

        info!("Book deleted: {}", isbn);
        Ok(Outcome::Done(format!("Book {} deleted successfully.", isbn)))
    }

    fn delete_publisher(&self, name: &str) -> Result<Outcome, Error> {
        let deleted = self.store.delete_publisher(name)
            .inspect_err(logging_error)?;

        if deleted == 0 {
            return Ok(Outcome::NotFound(format!("Publisher {} not found.", name)));
        }

        info!("Publisher deleted: {}", name);
        Ok(Outcome::Done(format!("Publisher {} deleted successfully.", name)))
    }

    fn search(&self, search: &Search) -> Result<Vec<Book>, Error> {
        self.store.find(search)
            .inspect_err(logging_error)
    }

    fn close(self: Box<Self>) {
        self.store.close();
    }
}

/// 설정된 백엔드로 저장소를 연결한다.
///
/// 연결이나 스키마(인덱스) 준비에 실패하면 [`crate::item::ErrorKind::Connect`] 에러를 반환한다.
pub fn connect(config: &AppConfig) -> Result<Box<dyn BookRepository>, Error> {
    let store: Box<dyn Store> = match config.backend() {
        Backend::Mongo => {
            let client = configs::connect_to_mongo(config.mongo())
                .map_err(|e| Error::connect(e.to_string()))?;
            Box::new(MongoStore::open(client, config.mongo())?)
        }
        Backend::Postgres => {
            let pool = configs::connect_to_postgres(config.postgres())
                .map_err(|e| Error::connect(e.to_string()))?;
            Box::new(PgStore::open(pool)?)
        }
    };

    info!("Connected to {:?} store", config.backend());
    Ok(Box::new(StoreRepository::new(store)))
}

fn logging_error<E>(e: &E)
where
    E: Debug
{
    error!("{:?}", e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ErrorKind;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// 검색 조건의 의미를 그대로 흉내내는 메모리 저장소
    /// 복제본끼리 상태를 공유하기 때문에 저장소에 넘긴 후에도 내용을 확인할 수 있다.
    #[derive(Default, Clone)]
    struct MemoryStore {
        books: Rc<RefCell<Vec<Book>>>,
        publishers: Rc<RefCell<Vec<Publisher>>>,
        update_calls: Rc<Cell<usize>>,
        close_calls: Rc<Cell<usize>>,
    }

    fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    fn matches(search: &Search, book: &Book) -> bool {
        match search {
            Search::All => true,
            Search::Title(t) => contains_ignore_case(book.title(), t),
            Search::Isbn(i) => book.isbn().eq_ignore_ascii_case(i),
            Search::Publisher(p) => contains_ignore_case(book.published_by(), p),
            Search::PriceRange { min, max } => book.price().is_some_and(|p| *min <= p && p <= *max),
            Search::Year(y) => book.year() == *y,
            Search::TitleAndPublisher { title, publisher } => {
                contains_ignore_case(book.title(), title) && contains_ignore_case(book.published_by(), publisher)
            }
        }
    }

    impl Store for MemoryStore {
        fn insert_publisher(&self, publisher: &Publisher) -> Result<(), Error> {
            let mut publishers = self.publishers.borrow_mut();
            if publishers.iter().any(|p| p.name() == publisher.name()) {
                return Err(Error::new(ErrorKind::Duplicate, "name already exists"));
            }
            publishers.push(publisher.clone());
            Ok(())
        }

        fn insert_book(&self, book: &Book) -> Result<(), Error> {
            let mut books = self.books.borrow_mut();
            if books.iter().any(|b| b.isbn() == book.isbn()) {
                return Err(Error::new(ErrorKind::Duplicate, "isbn already exists"));
            }
            books.push(book.clone());
            Ok(())
        }

        fn update_book(&self, isbn: &str, patch: &BookPatch) -> Result<usize, Error> {
            self.update_calls.set(self.update_calls.get() + 1);

            let mut books = self.books.borrow_mut();
            let mut matched = 0;
            for book in books.iter_mut().filter(|b| b.isbn() == isbn) {
                let mut builder = book.to_builder();
                if let Some(title) = &patch.title {
                    builder = builder.title(title.clone());
                }
                if let Some(year) = patch.year {
                    builder = builder.year(year);
                }
                if let Some(published_by) = &patch.published_by {
                    builder = builder.published_by(published_by.clone());
                }
                if let Some(previous_edition) = &patch.previous_edition {
                    builder = builder.previous_edition(previous_edition.clone());
                }
                if let Some(price) = patch.price {
                    builder = builder.price(price);
                }
                *book = builder.build().unwrap();
                matched += 1;
            }
            Ok(matched)
        }

        fn delete_book(&self, isbn: &str) -> Result<usize, Error> {
            let mut books = self.books.borrow_mut();
            let before = books.len();
            books.retain(|b| b.isbn() != isbn);
            Ok(before - books.len())
        }

        fn delete_publisher(&self, name: &str) -> Result<usize, Error> {
            let mut publishers = self.publishers.borrow_mut();
            let before = publishers.len();
            publishers.retain(|p| p.name() != name);
            Ok(before - publishers.len())
        }

        fn find(&self, search: &Search) -> Result<Vec<Book>, Error> {
            Ok(self.books.borrow().iter()
                .filter(|b| matches(search, b))
                .cloned()
                .collect())
        }

        fn close(self: Box<Self>) {
            self.close_calls.set(self.close_calls.get() + 1);
        }
    }

    fn new_repository() -> (StoreRepository, MemoryStore) {
        let store = MemoryStore::default();
        let repository = StoreRepository::new(Box::new(store.clone()));
        (repository, store)
    }

    fn book(isbn: &str, title: &str, year: i32, published_by: &str, price: Option<f64>) -> Book {
        let mut builder = Book::builder()
            .isbn(isbn.to_owned())
            .title(title.to_owned())
            .year(year)
            .published_by(published_by.to_owned());
        if let Some(price) = price {
            builder = builder.price(price);
        }
        builder.build().unwrap()
    }

    #[test]
    fn add_then_search_by_isbn_round_trips() {
        let (repository, _) = new_repository();
        let original = Book::builder()
            .isbn("0441013597".to_owned())
            .title("Dune".to_owned())
            .year(1965)
            .published_by("Ace".to_owned())
            .previous_edition("0441172717".to_owned())
            .price(9.99)
            .build()
            .unwrap();

        let outcome = repository.add_book(&original).unwrap();
        assert_eq!(outcome, Outcome::Done("Book Dune added successfully.".to_owned()));

        let found = repository.search_books_by_isbn("0441013597").unwrap();
        assert_eq!(found, vec![original]);
    }

    #[test]
    fn add_book_rounds_price() {
        let (repository, store) = new_repository();
        repository.add_book(&book("1", "Half", 2001, "Ace", Some(19.995))).unwrap();

        assert_eq!(store.books.borrow()[0].price(), Some(19.99));
    }

    #[test]
    fn duplicate_isbn_is_a_structured_error() {
        let (repository, _) = new_repository();
        repository.add_book(&book("1", "Foo", 1990, "Ace", None)).unwrap();

        let err = repository.add_book(&book("1", "Bar", 1991, "Ace", None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn empty_edit_never_touches_the_store() {
        let (repository, store) = new_repository();
        repository.add_book(&book("1", "Foo", 1990, "Ace", None)).unwrap();

        let outcome = repository.edit_book("1", &BookPatch::default()).unwrap();

        assert!(matches!(outcome, Outcome::NoOp(_)));
        assert_eq!(store.update_calls.get(), 0);
        assert_eq!(store.books.borrow()[0], book("1", "Foo", 1990, "Ace", None));
    }

    #[test]
    fn edit_only_overwrites_supplied_fields() {
        let (repository, store) = new_repository();
        repository.add_book(&book("1", "Foo", 1990, "Ace", Some(5.0))).unwrap();

        let patch = BookPatch {
            title: Some("Foo Revised".to_owned()),
            price: Some(12.345),
            ..Default::default()
        };
        let outcome = repository.edit_book("1", &patch).unwrap();

        assert_eq!(outcome, Outcome::Done("Book 1 edited successfully.".to_owned()));
        assert_eq!(store.books.borrow()[0], book("1", "Foo Revised", 1990, "Ace", Some(12.35)));
    }

    #[test]
    fn edit_unknown_isbn_is_not_found() {
        let (repository, _) = new_repository();
        let patch = BookPatch { year: Some(2000), ..Default::default() };

        let outcome = repository.edit_book("404", &patch).unwrap();
        assert!(matches!(outcome, Outcome::NotFound(_)));
    }

    #[test]
    fn deleting_nonexistent_isbn_is_a_warning() {
        let (repository, _) = new_repository();

        let outcome = repository.delete_book("999").unwrap();
        assert_eq!(outcome, Outcome::NotFound("Book 999 not found.".to_owned()));
    }

    #[test]
    fn deleting_publisher_does_not_cascade() {
        let (repository, store) = new_repository();
        repository.add_publisher("Ace", "5551234", Some("NYC")).unwrap();
        repository.add_book(&book("111", "Foo", 1990, "Ace", Some(9.999))).unwrap();

        assert_eq!(store.books.borrow()[0].price(), Some(10.0));
        assert_eq!(repository.search_books_by_year(1990).unwrap().len(), 1);

        let outcome = repository.delete_publisher("Ace").unwrap();
        assert_eq!(outcome, Outcome::Done("Publisher Ace deleted successfully.".to_owned()));
        assert!(store.publishers.borrow().is_empty());
        assert_eq!(repository.search_books_by_publisher("ace").unwrap(), vec![book("111", "Foo", 1990, "Ace", Some(10.0))]);

        let again = repository.delete_publisher("Ace").unwrap();
        assert!(matches!(again, Outcome::NotFound(_)));
    }

    #[test]
    fn convenience_searches_build_expected_criteria() {
        let (repository, _) = new_repository();
        repository.add_book(&book("1", "Dune Messiah", 1969, "Putnam", Some(10.0))).unwrap();
        repository.add_book(&book("2", "Children of Dune", 1976, "Putnam", Some(20.0))).unwrap();
        repository.add_book(&book("3", "Neuromancer", 1984, "Ace", Some(15.0))).unwrap();

        assert_eq!(repository.search_all_books().unwrap().len(), 3);
        assert_eq!(repository.search_books_by_title("dune").unwrap().len(), 2);
        assert_eq!(repository.search_books_by_price_range(10.0, 15.0).unwrap().len(), 2);
        assert_eq!(repository.search_books_by_title_and_publisher("DUNE", "put").unwrap().len(), 2);
        assert_eq!(repository.search_books_by_title_and_publisher("dune", "ace").unwrap().len(), 0);
        assert_eq!(repository.field_names().len(), 6);
    }

    #[test]
    fn close_releases_the_store() {
        let (repository, store) = new_repository();
        let repository: Box<dyn BookRepository> = Box::new(repository);

        repository.close();
        assert_eq!(store.close_calls.get(), 1);
    }
}
