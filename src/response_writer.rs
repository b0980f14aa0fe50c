use crate::status::{self, Status};

/// Buffers a response until the handler chain is done, then serializes it
/// in one piece. Handlers that never set a status get a 200.
#[derive(Debug)]
pub struct ResponseWriter {
    status_code: Option<u16>,
    reason_phrase: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new_empty() -> Self {
        Self {
            status_code: None,
            reason_phrase: None,
            headers: vec![],
            body: vec![],
        }
    }

    pub fn get_status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn set_status(&mut self, status: Status) {
        self.status_code = Some(status.code());
        self.reason_phrase = Some(status.as_str().to_owned());
    }

    pub fn set_status_code(&mut self, status_code: u16) {
        self.status_code = Some(status_code);
        self.reason_phrase = status::reason_phrase(status_code).map(|r| r.to_owned());
    }

    pub fn set_header(&mut self, k: String, v: String) {
        if let Some(entry) = self.headers.iter_mut().find(|entry| entry.0 == k) {
            entry.1 = v;
        } else {
            self.headers.push((k, v));
        }
    }

    fn set_content_type_header(&mut self, content_type: &str) {
        self.set_header("Content-Type".to_owned(), content_type.to_owned());
    }

    fn set_content_length_header(&mut self) {
        self.set_header("Content-Length".to_owned(), self.body.len().to_string());
    }

    pub fn get_body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>, content_type: &str) {
        self.body = body;
        self.set_content_type_header(content_type);
        self.set_content_length_header();
    }

    pub fn write(mut self) -> Vec<u8> {
        if self.status_code.is_none() {
            self.set_status(Status::OK);
        }
        let mut status_line = format!("HTTP/1.1 {}", self.status_code.unwrap());
        if let Some(reason_phrase) = &self.reason_phrase {
            status_line = format!("{} {}", status_line, reason_phrase);
        }
        status_line.push_str("\r\n");

        let mut headers = self
            .headers
            .into_iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect::<Vec<_>>()
            .join("");
        headers.push_str("\r\n");

        let mut resp = vec![];
        resp.extend(status_line.bytes());
        resp.extend(headers.bytes());
        resp.extend(self.body);
        resp
    }
}
