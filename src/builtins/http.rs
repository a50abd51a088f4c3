//=====================================================
// File: builtins/http.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: HTTP client and server built-ins
// Objective: anun/anun_async over ureq, server_chalu over hyper http1 on
//            the interpreter's LocalSet, and the uttor/json_uttor helpers
//=====================================================

//=============================================
//            Section 1: Imports
//=============================================

use super::json::value_to_json;
use super::{between, exact, fit_args, int_arg, register_sync, string_arg};
use crate::interpreter::{
    Control, EvalResult, Handle, Interpreter, OrderedMap, RuntimeError, Value,
};
use crate::runtime::promise::Promise;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::cell::RefCell;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::rc::Rc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

pub fn register(interpreter: &Interpreter) {
    register_sync(interpreter, "anun", exact(1), fetch_sync);
    register_sync(interpreter, "anun_async", exact(1), fetch_async);
    register_sync(interpreter, "server_chalu", exact(2), start_server);
    register_sync(interpreter, "uttor", between(2, 4), respond);
    register_sync(interpreter, "json_uttor", between(2, 3), respond_json);
}

//=============================================
//            Section 2: Client
//=============================================

/// A fetched response in thread-safe form, converted to a map on the
/// interpreter thread.
struct FetchedResponse {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
}

impl FetchedResponse {
    fn into_value(self) -> Value {
        let headers: OrderedMap = self
            .headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        let mut map = OrderedMap::new();
        map.insert("status", Value::Int(self.status as i64));
        map.insert("body", Value::String(self.body));
        map.insert("headers", Value::map(headers));
        Value::map(map)
    }
}

/// HTTP error statuses are returned as responses; only transport failures
/// raise.
fn fetch(agent: &ureq::Agent, url: &str) -> Result<FetchedResponse, RuntimeError> {
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(err) => return Err(RuntimeError::Network(format!("GET {}: {}", url, err))),
    };
    let status = response.status();
    let headers = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name).map(str::to_string);
            value.map(|value| (name, value))
        })
        .collect();
    let body = response
        .into_string()
        .map_err(|err| RuntimeError::Network(format!("GET {}: {}", url, err)))?;
    Ok(FetchedResponse {
        status,
        body,
        headers,
    })
}

/// Blocks the interpreter thread until the response arrives.
fn fetch_sync(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let url = string_arg("anun", args, 0)?;
    debug!(url, "GET");
    Ok(fetch(interpreter.http_agent(), url)?.into_value())
}

/// Runs the request on the blocking pool and returns a promise.
fn fetch_async(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let url = string_arg("anun_async", args, 0)?.to_string();
    let agent = interpreter.http_agent().clone();
    let promise = Rc::new(Promise::new());
    let settle = Rc::clone(&promise);
    interpreter.spawn_tracked("http-fetch", async move {
        debug!(url = %url, "GET (async)");
        let joined = tokio::task::spawn_blocking(move || fetch(&agent, &url)).await;
        match joined {
            Ok(Ok(response)) => settle.resolve(response.into_value()),
            Ok(Err(err)) => settle.reject(Value::String(err.to_string())),
            Err(err) => settle.reject(Value::String(format!("network error: {}", err))),
        };
    });
    Ok(Value::Promise(promise))
}

//=============================================
//            Section 3: Response Slot
//=============================================

struct ResponseData {
    status: u16,
    content_type: String,
    body: String,
    sent: bool,
}

/// The `res` object handed to server handlers.
pub struct ResponseSlot {
    data: RefCell<ResponseData>,
}

impl Default for ResponseSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self {
            data: RefCell::new(ResponseData {
                status: 204,
                content_type: "text/plain; charset=utf-8".into(),
                body: String::new(),
                sent: false,
            }),
        }
    }

    /// Records the response; a second call overwrites the first.
    pub fn send(&self, status: u16, content_type: impl Into<String>, body: String) {
        let mut data = self.data.borrow_mut();
        if data.sent {
            warn!("response written twice; keeping the latest");
        }
        data.status = status;
        data.content_type = content_type.into();
        data.body = body;
        data.sent = true;
    }

    pub fn is_sent(&self) -> bool {
        self.data.borrow().sent
    }

    fn to_response(&self) -> Response<Full<Bytes>> {
        let data = self.data.borrow();
        build_response(data.status, &data.content_type, data.body.clone())
    }
}

fn build_response(status: u16, content_type: &str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if let Ok(value) = hyper::header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(hyper::header::CONTENT_TYPE, value);
    }
    response
}

fn response_slot<'a>(name: &str, args: &'a [Value]) -> Result<&'a ResponseSlot, RuntimeError> {
    match args.first() {
        Some(Value::Handle(handle)) => match handle.as_ref() {
            Handle::Response(slot) => Ok(slot),
            Handle::Emitter(_) => Err(RuntimeError::argument(format!(
                "{} expects a response object, got emitter",
                name
            ))),
        },
        other => Err(RuntimeError::argument(format!(
            "{} expects a response object, got {}",
            name,
            other.map(Value::type_name).unwrap_or("nothing")
        ))),
    }
}

fn status_arg(name: &str, args: &[Value], position: usize) -> Result<u16, RuntimeError> {
    match args.get(position) {
        None => Ok(200),
        Some(_) => {
            let code = int_arg(name, args, position)?;
            u16::try_from(code)
                .ok()
                .filter(|code| (100..=599).contains(code))
                .ok_or_else(|| RuntimeError::argument(format!("{} got invalid status {}", name, code)))
        }
    }
}

/// `uttor(res, body[, status[, contentType]])`
fn respond(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let slot = response_slot("uttor", args)?;
    let status = status_arg("uttor", args, 2)?;
    let content_type = match args.get(3) {
        Some(_) => string_arg("uttor", args, 3)?.to_string(),
        None => "text/plain; charset=utf-8".to_string(),
    };
    slot.send(status, content_type, args[1].to_string());
    Ok(Value::Null)
}

/// `json_uttor(res, value[, status])`
fn respond_json(_interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let slot = response_slot("json_uttor", args)?;
    let status = status_arg("json_uttor", args, 2)?;
    let body = value_to_json(&args[1])?.to_string();
    slot.send(status, "application/json", body);
    Ok(Value::Null)
}

//=============================================
//            Section 4: Server
//=============================================

/// `server_chalu(port, handler)`: binds immediately and returns the bound
/// port (useful with port 0). Requests are served on local tasks.
fn start_server(interpreter: &Interpreter, args: &[Value]) -> EvalResult {
    let port = int_arg("server_chalu", args, 0)?;
    let port = u16::try_from(port)
        .map_err(|_| RuntimeError::argument(format!("server_chalu got invalid port {}", port)))?;
    let handler = super::callable_arg("server_chalu", args, 1)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let std_listener = std::net::TcpListener::bind(addr)
        .map_err(|err| RuntimeError::Network(format!("cannot bind port {}: {}", port, err)))?;
    std_listener
        .set_nonblocking(true)
        .map_err(|err| RuntimeError::Network(err.to_string()))?;
    let bound = std_listener
        .local_addr()
        .map_err(|err| RuntimeError::Network(err.to_string()))?
        .port();
    let listener = TcpListener::from_std(std_listener)
        .map_err(|err| RuntimeError::Network(err.to_string()))?;
    info!(port = bound, "server listening");

    let server = interpreter.clone();
    interpreter.spawn_tracked("http-server", async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(error = %err, "accept failed");
                    continue;
                }
            };
            let connection = server.clone();
            let handler = handler.clone();
            tokio::task::spawn_local(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let interpreter = connection.clone();
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handle_request(interpreter, handler, request).await) }
                });
                if let Err(err) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!(peer = %peer, error = %err, "connection closed with error");
                }
            });
        }
    });
    Ok(Value::Int(bound as i64))
}

async fn handle_request(
    interpreter: Interpreter,
    handler: Value,
    request: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();
    let body = match body.collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            String::new()
        }
    };

    let headers: OrderedMap = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), Value::from(value)))
        })
        .collect();
    let mut req = OrderedMap::new();
    req.insert("method", Value::from(parts.method.as_str()));
    req.insert("path", Value::from(parts.uri.path()));
    req.insert("query", Value::map(parse_query(parts.uri.query().unwrap_or(""))));
    req.insert("headers", Value::map(headers));
    req.insert("body", Value::String(body));

    let handle = Rc::new(Handle::Response(ResponseSlot::new()));
    let args = fit_args(&handler, vec![Value::map(req), Value::Handle(Rc::clone(&handle))]);
    let outcome = match interpreter.call_value(handler, args).await {
        Ok(value) => interpreter.await_value(value).await,
        Err(control) => Err(control),
    };

    match outcome {
        Ok(_) => match handle.as_ref() {
            Handle::Response(slot) => {
                if !slot.is_sent() {
                    debug!(path = parts.uri.path(), "handler sent no response");
                }
                slot.to_response()
            }
            Handle::Emitter(_) => build_response(500, "text/plain; charset=utf-8", String::new()),
        },
        Err(Control::Exit(code)) => {
            interpreter.request_exit(code);
            build_response(503, "text/plain; charset=utf-8", "shutting down".into())
        }
        Err(Control::Throw(thrown)) => {
            error!(path = parts.uri.path(), error = %thrown.message(), "request handler failed");
            build_response(500, "text/plain; charset=utf-8", "Internal Server Error".into())
        }
        Err(_) => build_response(500, "text/plain; charset=utf-8", "Internal Server Error".into()),
    }
}

/// Splits `a=1&b=two` into a map, decoding `+` and `%XX`.
pub(crate) fn parse_query(query: &str) -> OrderedMap {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), Value::String(decode_component(value)))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'+' => out.push(b' '),
            b'%' if idx + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[idx + 1..idx + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        idx += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_strings_are_decoded() {
        let query = parse_query("name=Rahim+Uddin&city=Dhaka%20North&flag");
        assert_eq!(query.get("name").map(Value::to_string), Some("Rahim Uddin".into()));
        assert_eq!(query.get("city").map(Value::to_string), Some("Dhaka North".into()));
        assert_eq!(query.get("flag").map(Value::to_string), Some(String::new()));
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn stray_percent_is_kept() {
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
    }

    #[test]
    fn response_slot_records_latest_write() {
        let slot = ResponseSlot::new();
        assert!(!slot.is_sent());
        slot.send(201, "text/plain", "created".into());
        assert_eq!(slot.data.borrow().status, 201);
        assert_eq!(slot.data.borrow().body, "created");
        let response = slot.to_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

//=====================================================
// End of file
//=====================================================
