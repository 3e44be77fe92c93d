use crate::configs::database::Mongo;
use crate::item::repo::Store;
use crate::item::{Book, BookPatch, Error, ErrorKind, ItemError, Publisher, Search};
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::sync::{Client, Collection};
use mongodb::IndexModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// MongoDB 중복 키 에러 코드
const DUPLICATE_KEY_CODE: i32 = 11000;

/// 검색을 위해 도서 컬렉션에 생성할 보조 인덱스
const BOOK_INDEXES: [&str; 4] = ["title", "published_by", "price", "year"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDocument {
    isbn: String,
    title: String,
    year: i32,
    published_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_edition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
}

impl BookDocument {
    pub fn from(book: &Book) -> Self {
        Self {
            isbn: book.isbn().to_owned(),
            title: book.title().to_owned(),
            year: book.year(),
            published_by: book.published_by().to_owned(),
            previous_edition: book.previous_edition().map(|p| p.to_owned()),
            price: book.price(),
        }
    }

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherDocument {
    name: String,
    phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    city: Option<String>,
}

impl PublisherDocument {
    pub fn from(publisher: &Publisher) -> Self {
        Self {
            name: publisher.name().to_owned(),
            phone: publisher.phone().to_owned(),
            city: publisher.city().map(|c| c.to_owned()),
        }
    }
}

/// 문서형 저장소 (MongoDB)
pub struct MongoStore {
    client: Client,
    books: Collection<BookDocument>,
    publishers: Collection<PublisherDocument>,
}

impl MongoStore {

    /// 서버 연결을 확인하고 필요한 인덱스를 준비한다.
    ///
    /// 인덱스 생성은 멱등이므로 매 실행마다 호출해도 기존 인덱스는 그대로 유지된다.
    pub fn open(client: Client, config: &Mongo) -> Result<Self, Error> {
        let database = client.database(config.dbname());

        database.run_command(doc! { "ping": 1 }).run()
            .map_err(|e| Error::connect(e.to_string()))?;

        let store = Self {
            client,
            books: database.collection::<BookDocument>(config.book_collection()),
            publishers: database.collection::<PublisherDocument>(config.publisher_collection()),
        };
        store.ensure_indexes()?;

        info!("MongoDB store opened: {}", config.dbname());
        Ok(store)
    }

    fn ensure_indexes(&self) -> Result<(), Error> {
        let unique = IndexOptions::builder().unique(true).build();

        self.books.create_index(
            IndexModel::builder()
                .keys(doc! { "isbn": 1 })
                .options(unique.clone())
                .build()
        ).run().map_err(|e| Error::connect(e.to_string()))?;

        for field in BOOK_INDEXES {
            let mut keys = Document::new();
            keys.insert(field, 1);

            self.books.create_index(IndexModel::builder().keys(keys).build())
                .run()
                .map_err(|e| Error::connect(e.to_string()))?;
        }

        self.publishers.create_index(
            IndexModel::builder()
                .keys(doc! { "name": 1 })
                .options(unique)
                .build()
        ).run().map_err(|e| Error::connect(e.to_string()))?;

        debug!("MongoDB indexes ensured");
        Ok(())
    }
}

impl Store for MongoStore {
    fn insert_publisher(&self, publisher: &Publisher) -> Result<(), Error> {
        self.publishers.insert_one(PublisherDocument::from(publisher)).run()
            .map_err(to_error)?;

        Ok(())
    }

    fn insert_book(&self, book: &Book) -> Result<(), Error> {
        self.books.insert_one(BookDocument::from(book)).run()
            .map_err(to_error)?;

        Ok(())
    }

    fn update_book(&self, isbn: &str, patch: &BookPatch) -> Result<usize, Error> {
        let filter = doc! { "isbn": isbn };
        let update = doc! { "$set": to_set_document(patch) };

        let result = self.books.update_one(filter, update).run()
            .map_err(to_error)?;

        Ok(result.matched_count as usize)
    }

    fn delete_book(&self, isbn: &str) -> Result<usize, Error> {
        let result = self.books.delete_one(doc! { "isbn": isbn }).run()
            .map_err(to_error)?;

        Ok(result.deleted_count as usize)
    }

    fn delete_publisher(&self, name: &str) -> Result<usize, Error> {
        let result = self.publishers.delete_one(doc! { "name": name }).run()
            .map_err(to_error)?;

        Ok(result.deleted_count as usize)
    }

    fn find(&self, search: &Search) -> Result<Vec<Book>, Error> {
        let filter = to_filter(search);
        debug!("find books: {} => {}", search, filter);

        let cursor = self.books.find(filter)
            .projection(doc! { "_id": 0 })
            .sort(doc! { "isbn": 1 })
            .run()
            .map_err(to_error)?;

        let docs = cursor
            .collect::<Result<Vec<BookDocument>, mongodb::error::Error>>()
            .map_err(to_error)?;

        docs.into_iter()
            .map(|d| d.to_domain().map_err(|e| Error::new(ErrorKind::Convert, e.to_string())))
            .collect()
    }

    /// 백그라운드 작업을 정리하고 커넥션 풀을 닫는다.
    fn close(self: Box<Self>) {
        let MongoStore { client, books, publishers } = *self;
        drop(books);
        drop(publishers);

        client.shutdown().run();
        info!("MongoDB store closed");
    }
}

/// 검색 조건을 MongoDB 필터 문서로 변환한다.
///
/// 사용자 입력은 [`regex::escape`]로 이스케이프 하여 정규표현식 메타 문자가 그대로 검색되도록 한다.
pub fn to_filter(search: &Search) -> Document {
    match search {
        Search::All => doc! {},
        Search::Title(title) => doc! { "title": contains(title) },
        Search::Isbn(isbn) => doc! {
            "isbn": { "$regex": format!("^{}$", regex::escape(isbn)), "$options": "i" }
        },
        Search::Publisher(publisher) => doc! { "published_by": contains(publisher) },
        Search::PriceRange { min, max } => doc! { "price": { "$gte": *min, "$lte": *max } },
        Search::Year(year) => doc! { "year": *year },
        Search::TitleAndPublisher { title, publisher } => doc! {
            "title": contains(title),
            "published_by": contains(publisher),
        },
    }
}

fn contains(s: &str) -> Document {
    doc! { "$regex": regex::escape(s), "$options": "i" }
}

/// 입력된 필드만 `$set` 대상 문서로 만든다.
pub fn to_set_document(patch: &BookPatch) -> Document {
    let mut set = Document::new();

    if let Some(title) = &patch.title {
        set.insert("title", title.as_str());
    }
    if let Some(year) = patch.year {
        set.insert("year", year);
    }
    if let Some(published_by) = &patch.published_by {
        set.insert("published_by", published_by.as_str());
    }
    if let Some(previous_edition) = &patch.previous_edition {
        set.insert("previous_edition", previous_edition.as_str());
    }
    if let Some(price) = patch.price {
        set.insert("price", price);
    }

    set
}

fn to_error(e: mongodb::error::Error) -> Error {
    let kind = match e.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY_CODE => ErrorKind::Duplicate,
        MongoErrorKind::ServerSelection { .. } | MongoErrorKind::Io(_) => ErrorKind::Connect,
        _ => ErrorKind::Persistence,
    };

    Error::new(kind, e.to_string())
}
