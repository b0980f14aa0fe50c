#[cfg(test)]
use std::net::SocketAddr;
use std::{
    io::Write,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    panic::{self, AssertUnwindSafe},
    thread,
    time::Duration,
};

use tracing::{error, info, span, Level, Span};

use crate::{
    request::{EndOfFile, Request, RequestReader},
    response_writer::ResponseWriter,
    status::Status,
};

/// The transport-facing seam: consumes one parsed request, produces one
/// response. The engine implements this; tests substitute closures.
pub trait Service {
    fn serve(&self, r: Request) -> ResponseWriter;
}

impl<T> Service for T
where
    T: Fn(Request) -> ResponseWriter,
{
    fn serve(&self, r: Request) -> ResponseWriter {
        self(r)
    }
}

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
}

impl Server {
    pub fn new(addr: impl ToSocketAddrs) -> Self {
        Self {
            listener: TcpListener::bind(addr).unwrap(),
        }
    }

    #[cfg(test)]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr().unwrap()
    }

    pub fn run(&self, service: impl Service + Sync) {
        let read_timeout = Some(Duration::from_secs(10));
        thread::scope(|s| {
            for stream in self.listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        error!(?err);
                        continue;
                    }
                };

                s.spawn(|| {
                    let span = create_conn_span(&stream);
                    let _guard = span.enter();
                    info!("new conn");

                    if let Err(err) = handle_connection(stream, read_timeout, &service) {
                        error!(?err);
                    }

                    info!("conn end");
                });
            }
        });
    }
}

#[derive(Debug)]
enum ConnCtrl {
    KeepAlive,
    Close,
}

fn handle_connection(
    stream: TcpStream,
    read_timeout: Option<Duration>,
    service: &(impl Service + Sync),
) -> anyhow::Result<()> {
    let (reader, writer) = (&stream, &stream);
    reader.set_read_timeout(read_timeout)?;
    let mut request_reader = RequestReader::new(reader);

    loop {
        match handle_request(&mut request_reader, writer, service) {
            Ok(ConnCtrl::KeepAlive) => continue,
            Ok(ConnCtrl::Close) => return Ok(()),
            Err(err) => {
                return Err(err);
            }
        }
    }
}

fn handle_request(
    request_reader: &mut RequestReader<&TcpStream>,
    mut writer: &TcpStream,
    service: &(impl Service + Sync),
) -> anyhow::Result<ConnCtrl> {
    let r = match request_reader.read() {
        Ok(r) => r,
        Err(err) => {
            if err.downcast_ref::<EndOfFile>().is_some() {
                return Ok(ConnCtrl::Close);
            }

            error!(?err);
            let mut w = ResponseWriter::new_empty();
            w.set_status(Status::BadRequest);
            writer.write_all(&w.write())?;
            return Ok(ConnCtrl::Close);
        }
    };

    let span = create_req_span(&r);
    let _guard = span.enter();
    info!(?r);

    let conn_ctrl = match r
        .get_header("connection")
        .map(|val| val.split(',').any(|tok| tok.trim() == "close"))
    {
        Some(true) => ConnCtrl::Close,
        _ => ConnCtrl::KeepAlive,
    };

    // Handler faults are Results and never reach this point; this is the
    // last line of defense so a panicking handler cannot take the worker
    // (and with it the scope) down.
    let w = match panic::catch_unwind(AssertUnwindSafe(|| service.serve(r))) {
        Ok(w) => w,
        Err(_) => {
            error!("handler panicked");
            let mut w = ResponseWriter::new_empty();
            w.set_status(Status::InternalServerError);
            w.set_body(b"Internal Server Error".to_vec(), "text/plain;charset=utf-8");
            w
        }
    };

    writer.write_all(&w.write())?;
    Ok(conn_ctrl)
}

fn create_conn_span(stream: &TcpStream) -> Span {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => &addr.to_string(),
        Err(err) => {
            error!(?err);
            "unknown"
        }
    };

    span!(Level::INFO, "conn", peer_addr)
}

fn create_req_span(r: &Request) -> Span {
    let http_method = r.get_http_method();
    let request_target = r.get_request_target();
    span!(
        Level::INFO,
        "req",
        method = http_method,
        target = request_target
    )
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        thread,
        time::Duration,
    };

    use crate::{request::Request, response_writer::ResponseWriter, status::Status};

    use super::{handle_connection, Server, Service};

    fn noop_service() -> impl Service + Sync {
        |_: Request| ResponseWriter::new_empty()
    }

    #[test]
    fn test_request_reader_timeout() {
        let timeout = Some(Duration::from_millis(100));

        let listener = TcpListener::bind("localhost:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server_handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, timeout, &noop_service())
        });

        let _client_handle = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.1\r\n").unwrap();
            loop {}
        });

        server_handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_persistent_connection() {
        let timeout = Some(Duration::from_millis(100));

        let server = Server::new("localhost:0");
        let addr = server.local_addr();

        thread::spawn(move || {
            server.run(|_: Request| {
                let mut w = ResponseWriter::new_empty();
                w.set_status(Status::OK);
                w
            });
        });

        let stream = TcpStream::connect(addr).unwrap();
        let (r, mut writer) = (&stream, &stream);
        r.set_read_timeout(timeout).unwrap();
        let mut reader = BufReader::new(r);

        writer.write_all(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        // Read to end tries to read until EOF but cannot do so
        // because the connection is not closed.
        // Instead, the timeout expires and an error is returned.
        let mut buf = vec![];
        let res = reader.read_to_end(&mut buf);
        res.unwrap_err();
    }

    #[test]
    fn test_bad_request() {
        let server = Server::new("localhost:0");
        let addr = server.local_addr();

        thread::spawn(move || {
            server.run(noop_service());
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"garbage\r\n\r\n").unwrap();

        let mut reader = BufReader::new(&stream);
        let mut status_line = String::new();
        reader.read_line(&mut status_line).unwrap();
        assert_eq!(status_line, "HTTP/1.1 400 Bad Request\r\n");
    }

    #[test]
    fn test_panicking_service_answers_500() {
        let server = Server::new("localhost:0");
        let addr = server.local_addr();

        thread::spawn(move || {
            server.run(|_: Request| -> ResponseWriter { panic!("kaboom") });
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
            .unwrap();

        let mut reader = BufReader::new(&stream);
        let mut status_line = String::new();
        reader.read_line(&mut status_line).unwrap();
        assert_eq!(status_line, "HTTP/1.1 500 Internal Server Error\r\n");
    }
}
