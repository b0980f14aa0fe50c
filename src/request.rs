use std::{
    collections::HashMap,
    io::{BufRead, BufReader, ErrorKind, Read, Take},
};

use thiserror::Error;
use tracing::info;

#[derive(Debug)]
struct RequestLine<'a> {
    line: &'a str,
}

impl<'a> RequestLine<'a> {
    fn new(line: &'a str) -> Self {
        Self { line }
    }

    fn http_method(&self) -> &'a str {
        self.line.split(" ").nth(0).unwrap()
    }

    fn request_target(&self) -> &'a str {
        self.line.split(" ").nth(1).unwrap()
    }

    #[allow(unused)]
    fn http_version(&self) -> &'a str {
        self.line.split(" ").nth(2).unwrap()
    }
}

/// Scans `key=value` pairs separated by `&`. Used for both the query
/// string and urlencoded form bodies. No percent-decoding.
fn find_pair<'a>(pairs: &'a str, key: &str) -> Option<&'a str> {
    pairs
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[derive(Debug)]
pub struct Request {
    request_line: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(
        request_line: String,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            request_line,
            headers,
            body,
        }
    }

    pub fn get_http_method(&self) -> &str {
        RequestLine::new(&self.request_line).http_method()
    }

    pub fn get_request_target(&self) -> &str {
        RequestLine::new(&self.request_line).request_target()
    }

    #[allow(unused)]
    pub fn get_http_version(&self) -> &str {
        RequestLine::new(&self.request_line).http_version()
    }

    /// The request target with the query string cut off. Routing works on
    /// this.
    pub fn get_path(&self) -> &str {
        let target = self.get_request_target();
        target.split_once('?').map_or(target, |(path, _)| path)
    }

    pub fn get_query(&self, key: &str) -> Option<&str> {
        let (_, query) = self.get_request_target().split_once('?')?;
        find_pair(query, key)
    }

    /// A value from an urlencoded request body.
    pub fn get_form_value(&self, key: &str) -> Option<&str> {
        let body = std::str::from_utf8(self.body.as_deref()?).ok()?;
        find_pair(body, key)
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    pub fn get_body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

#[derive(Error, Debug)]
#[error("end of file")]
pub struct EndOfFile;

#[derive(Error, Debug)]
#[error("invalid request")]
pub struct InvalidRequest;

pub struct RequestReader<R> {
    buf_reader: Take<BufReader<R>>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(r: R) -> Self {
        Self {
            buf_reader: BufReader::new(r).take(u64::MAX),
        }
    }

    pub fn read(&mut self) -> anyhow::Result<Request> {
        let mut request_line = String::new();
        self.buf_reader.set_limit(1024);
        let n = self.buf_reader.read_line(&mut request_line)?;
        if n == 0 {
            Err(EndOfFile)?
        }
        request_line = request_line
            .strip_suffix("\r\n")
            .ok_or(InvalidRequest)?
            .to_owned();

        if request_line.split(" ").count() != 3 {
            Err(InvalidRequest)?
        }

        info!(?request_line);

        let mut headers = HashMap::new();
        self.buf_reader.set_limit(8 * 1024);
        loop {
            let mut line = String::new();
            self.buf_reader.read_line(&mut line)?;
            line = line.strip_suffix("\r\n").ok_or(InvalidRequest)?.to_owned();

            if line.is_empty() {
                break;
            }
            let (k, v) = line.split_once(":").ok_or(InvalidRequest)?;
            headers.insert(k.to_lowercase(), v.trim().to_owned());
        }

        self.buf_reader.set_limit(8 * 1024);
        let mut body = None;
        if let Some(content_length) = headers.get("content-length") {
            let mut buf = vec![0; content_length.parse().map_err(|_| InvalidRequest)?];
            if let Err(err) = self.buf_reader.read_exact(&mut buf) {
                if err.kind() == ErrorKind::UnexpectedEof {
                    Err(InvalidRequest)?
                } else {
                    Err(err)?
                }
            }
            body = Some(buf)
        };

        Ok(Request::new(request_line, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        io::{self, Cursor},
    };

    use crate::test_utils::ErrReader;

    use super::{EndOfFile, InvalidRequest, Request, RequestReader};

    #[test]
    fn test_request() {
        let r = Request::new("GET / HTTP/1.1".to_owned(), HashMap::new(), None);
        assert_eq!(r.get_http_method(), "GET");
        assert_eq!(r.get_request_target(), "/");
        assert_eq!(r.get_http_version(), "HTTP/1.1");
    }

    #[test]
    fn test_request_path_and_query() {
        let r = Request::new(
            "GET /items?page=2&sort=asc HTTP/1.1".to_owned(),
            HashMap::new(),
            None,
        );
        assert_eq!(r.get_request_target(), "/items?page=2&sort=asc");
        assert_eq!(r.get_path(), "/items");
        assert_eq!(r.get_query("page"), Some("2"));
        assert_eq!(r.get_query("sort"), Some("asc"));
        assert_eq!(r.get_query("missing"), None);
    }

    #[test]
    fn test_request_path_without_query() {
        let r = Request::new("GET /items HTTP/1.1".to_owned(), HashMap::new(), None);
        assert_eq!(r.get_path(), "/items");
        assert_eq!(r.get_query("page"), None);
    }

    #[test]
    fn test_request_form_value() {
        let r = Request::new(
            "POST /login HTTP/1.1".to_owned(),
            HashMap::new(),
            Some(b"user=gopher&pass=secret".to_vec()),
        );
        assert_eq!(r.get_form_value("user"), Some("gopher"));
        assert_eq!(r.get_form_value("pass"), Some("secret"));
        assert_eq!(r.get_form_value("other"), None);
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // request line
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_request_reader_request_line_ok() {
        let cursor = Cursor::new("GET / HTTP/1.1\r\n\r\n");
        let mut request_reader = RequestReader::new(cursor);
        let r = request_reader.read().unwrap();
        assert_eq!(r.get_http_method(), "GET");
        assert_eq!(r.get_request_target(), "/");
        assert_eq!(r.get_http_version(), "HTTP/1.1");
    }

    #[test]
    fn test_request_reader_request_line_empty() {
        let cursor = Cursor::new("");
        let mut request_reader = RequestReader::new(cursor);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<EndOfFile>().unwrap();
    }

    #[test]
    fn test_request_reader_request_line_error() {
        let err_reader = ErrReader::new(b"GET /");
        let mut request_reader = RequestReader::new(err_reader);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<io::Error>().unwrap();
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // headers
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_request_reader_headers_ok() {
        let data = "GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let r = request_reader.read().unwrap();
        assert_eq!(r.get_header("accept").unwrap(), "*/*");
        assert_eq!(r.get_header("Accept").unwrap(), "*/*");
    }

    #[test]
    fn test_request_reader_headers_no_colon() {
        let data = "GET / HTTP/1.1\r\nAccept */*\r\n\r\n";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<InvalidRequest>().unwrap();
    }

    #[test]
    fn test_request_reader_missing_newline_after_headers() {
        let data = "GET / HTTP/1.1\r\n";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<InvalidRequest>().unwrap();
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // body
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_request_reader_body() {
        let data = "PUT /items/1 HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let r = request_reader.read().unwrap();
        assert_eq!(r.get_body().unwrap(), b"hello");
    }

    #[test]
    fn test_request_reader_body_truncated() {
        let data = "POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<InvalidRequest>().unwrap();
    }

    #[test]
    fn test_request_reader_bad_content_length() {
        let data = "POST / HTTP/1.1\r\nContent-Length: nan\r\n\r\n";
        let cursor = Cursor::new(data);
        let mut request_reader = RequestReader::new(cursor);
        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<InvalidRequest>().unwrap();
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // multiple requests
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_request_reader_multiple_requests() {
        let fst = "GET / HTTP/1.1\r\n\r\n";
        let snd = "GET /about HTTP/1.1\r\n\r\n";
        let cursor = Cursor::new(format!("{}{}", fst, snd));
        let mut request_reader = RequestReader::new(cursor);

        let r = request_reader.read().unwrap();
        assert_eq!(r.get_request_target(), "/");

        let r = request_reader.read().unwrap();
        assert_eq!(r.get_request_target(), "/about");

        let res = request_reader.read();
        res.unwrap_err().downcast_ref::<EndOfFile>().unwrap();
    }
}
