use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

/// MongoDB 연결 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Mongo {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    dbname: String,

    /// 도서 컬렉션명
    book_collection: String,

    /// 출판사 컬렉션명
    publisher_collection: String,

    /// 서버 선택 타임아웃 (단위는 밀리세컨드(ms))
    timeout: u64,
}

impl Default for Mongo {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 27017,
            username: None,
            password: None,
            dbname: "bookmanager".to_owned(),
            book_collection: "Book".to_owned(),
            publisher_collection: "Publisher".to_owned(),
            timeout: 5000,
        }
    }
}

impl Mongo {
    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    pub fn book_collection(&self) -> &str {
        &self.book_collection
    }

    pub fn publisher_collection(&self) -> &str {
        &self.publisher_collection
    }

    pub fn url(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!("{}:{}@", encode(username), encode(password)),
            (Some(username), None) => format!("{}@", encode(username)),
            _ => String::new(),
        };

        format!("mongodb://{}{}:{}/?serverSelectionTimeoutMS={}", credentials, self.host, self.port, self.timeout)
    }
}

/// PostgreSQL 연결 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Postgres {
    host: String,
    port: u16,
    username: String,
    password: String,
    dbname: String,

    /// 커넥션 풀 최대 크기
    pool_size: u32,

    /// 커넥션 획득 타임아웃 (단위는 초)
    timeout: u64,
}

impl Default for Postgres {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5432,
            username: "postgres".to_owned(),
            password: String::new(),
            dbname: "bookmanager".to_owned(),
            pool_size: 2,
            timeout: 5,
        }
    }
}

impl Postgres {
    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            encode(&self.username), encode(&self.password), self.host, self.port, encode(&self.dbname)
        )
    }
}

/// URL의 사용자 정보, 경로에 들어가는 값은 `@`, `:`, `/` 등을 퍼센트 인코딩 한다.
fn encode(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}
