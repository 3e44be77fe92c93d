use crate::item::round_price;
use thiserror::Error;

/// ISBN-13의 길이
pub const MAX_ISBN_LENGTH: usize = 13;

/// 입력값 검증 에러
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty.")]
    Empty(&'static str),

    #[error("{0} must contain digits only.")]
    NotDigits(&'static str),

    #[error("{0} must be 4 digits long.")]
    NotFourDigits(&'static str),

    #[error("{0} must be at most {1} characters long.")]
    TooLong(&'static str, usize),

    #[error("{0} must be a non-negative number.")]
    InvalidPrice(&'static str),

    #[error("Please enter a number from 1 to {0}.")]
    InvalidOption(usize),
}

/// 입력값을 정규화 한다.
///
/// 앞뒤 공백을 제거하고 양 끝을 감싼 따옴표를 모두 벗겨낸다.
/// `null`, `none`(대소문자 무시)은 빈 값으로 취급한다.
pub fn normalize(raw: &str) -> String {
    let mut s = raw.trim();

    while s.len() >= 2 && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"'))) {
        s = &s[1..s.len() - 1];
    }

    if s.eq_ignore_ascii_case("null") || s.eq_ignore_ascii_case("none") {
        return String::new();
    }

    s.to_owned()
}

pub fn required(field: &'static str, s: &str) -> Result<String, ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(s.to_owned())
}

pub fn digits(field: &'static str, s: &str) -> Result<String, ValidationError> {
    let s = required(field, s)?;
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::NotDigits(field));
    }
    Ok(s)
}

/// ISBN은 숫자로만 구성되며 ISBN-10의 마지막 검증 문자 `X`만 예외로 허용한다.
pub fn isbn(field: &'static str, s: &str) -> Result<String, ValidationError> {
    let s = required(field, s)?;
    if s.chars().count() > MAX_ISBN_LENGTH {
        return Err(ValidationError::TooLong(field, MAX_ISBN_LENGTH));
    }
    let body = s.strip_suffix(['X', 'x']).unwrap_or(&s);

    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::NotDigits(field));
    }
    Ok(s.to_uppercase())
}

/// 빈 값이면 [`None`]
pub fn optional_isbn(field: &'static str, s: &str) -> Result<Option<String>, ValidationError> {
    if s.is_empty() {
        return Ok(None);
    }
    isbn(field, s).map(Some)
}

/// 앞자리 0을 제외한 값이 네 자리여야 한다. (`0999`는 허용하지 않음)
pub fn year(field: &'static str, s: &str) -> Result<i32, ValidationError> {
    let s = digits(field, s)?;
    match s.parse::<i32>() {
        Ok(year) if (1000..=9999).contains(&year) => Ok(year),
        _ => Err(ValidationError::NotFourDigits(field)),
    }
}

/// 소수점 두 자리로 반올림된 가격
pub fn price(field: &'static str, s: &str) -> Result<f64, ValidationError> {
    let s = required(field, s)?;
    let price = s.parse::<f64>().map_err(|_| ValidationError::InvalidPrice(field))?;

    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::InvalidPrice(field));
    }

    let price = round_price(price);
    if !price.is_finite() {
        return Err(ValidationError::InvalidPrice(field));
    }
    Ok(price)
}

/// 빈 값이면 [`None`]
pub fn optional_price(field: &'static str, s: &str) -> Result<Option<f64>, ValidationError> {
    if s.is_empty() {
        return Ok(None);
    }
    price(field, s).map(Some)
}

pub fn option(s: &str, max: usize) -> Result<usize, ValidationError> {
    s.parse::<usize>().map_err(|_| ValidationError::InvalidOption(max))
}

/// `y`, `yes`(대소문자 무시)만 동의로 취급한다.
pub fn is_yes(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "y" | "yes")
}
