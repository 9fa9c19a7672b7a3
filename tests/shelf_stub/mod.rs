#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

/// A bookcase endpoint served from a fixed table of path -> JSON body.
/// Unknown paths answer 404.
pub struct ShelfStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct StubRequest {
    pub path: String,
    pub cookie: Option<String>,
}

impl ShelfStub {
    pub fn spawn(pages: HashMap<String, String>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start shelf stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let cookie = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Cookie"))
                    .map(|h| h.value.as_str().to_owned());
                seen.lock().expect("stub requests").push(StubRequest {
                    path: path.clone(),
                    cookie,
                });

                let response = match pages.get(&path) {
                    Some(body) => tiny_http::Response::from_string(body.clone())
                        .with_header(
                            "Content-Type: application/json"
                                .parse::<tiny_http::Header>()
                                .expect("content-type header"),
                        ),
                    None => tiny_http::Response::from_string("not found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn endpoint_template(&self) -> String {
        format!(
            "{}/v1/bookcase/books/{{user_id}}/shelf_id:{{status_id}}/page:{{page}}/limit:{{limit}}",
            self.base_url
        )
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().expect("stub requests").clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

impl Drop for ShelfStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn page_path(user_id: &str, status_id: u8, page: u32, limit: u32) -> String {
    format!("/v1/bookcase/books/{user_id}/shelf_id:{status_id}/page:{page}/limit:{limit}")
}

/// A bookcase item as the endpoint returns it.
pub fn item(title: &str) -> Value {
    json!({
        "ranking": 0,
        "dt_leitura": null,
        "edicao": { "titulo": title, "autor": "Autor" }
    })
}

pub fn items(prefix: &str, count: usize) -> Vec<Value> {
    (1..=count).map(|n| item(&format!("{prefix} {n}"))).collect()
}

pub fn body(items: Vec<Value>, paging: Option<Value>) -> String {
    let mut body = json!({ "response": items });
    if let Some(paging) = paging {
        body["paging"] = paging;
    }
    body.to_string()
}
