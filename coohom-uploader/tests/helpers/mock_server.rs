//! In-process mock of the Coohom API and the OSS bucket
//!
//! Serves the four Coohom endpoints plus `PUT /oss/*key` on an ephemeral
//! port. Responses are configured per test; requests are recorded.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use coohom_common::Credentials;
use coohom_uploader::client::CoohomClient;
use coohom_uploader::storage::OssObjectStore;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const APP_KEY: &str = "test-app-key";
pub const APP_SECRET: &str = "test-app-secret";

pub fn ok(data: Value) -> Value {
    json!({ "c": "0", "m": "", "d": data })
}

pub fn err(code: impl Into<Value>, message: &str) -> Value {
    json!({ "c": code.into(), "m": message, "d": null })
}

pub fn grant_payload(task_id: &str) -> Value {
    json!({
        "accessKeyId": "AKID",
        "accessKeySecret": "OSS-SECRET",
        "securityToken": "OSS-TOKEN",
        "bucket": "coohom-upload",
        "region": "oss-cn-hangzhou",
        "filePath": format!("upload/{}/model.zip", task_id),
        "uploadTaskId": task_id,
    })
}

/// A canned response: HTTP status plus JSON body
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: Value,
}

impl From<Value> for Canned {
    fn from(body: Value) -> Self {
        Self { status: 200, body }
    }
}

impl Canned {
    pub fn http(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// One recorded API call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub params: HashMap<String, String>,
}

/// One recorded object PUT
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

struct Inner {
    sts: Canned,
    parse: Canned,
    statuses: VecDeque<Canned>,
    submit: Canned,
    oss_status: u16,
    calls: Vec<RecordedCall>,
    uploads: Vec<RecordedUpload>,
}

#[derive(Clone)]
pub struct MockCoohom {
    inner: Arc<Mutex<Inner>>,
}

impl MockCoohom {
    /// Happy-path defaults: grant `T1`, status 3, submit returns `M-1`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sts: ok(grant_payload("T1")).into(),
                parse: ok(Value::Null).into(),
                statuses: VecDeque::from([Canned::from(ok(json!({ "status": 3 })))]),
                submit: ok(json!({ "modelId": "M-1" })).into(),
                oss_status: 200,
                calls: Vec::new(),
                uploads: Vec::new(),
            })),
        }
    }

    pub fn set_sts(&self, response: impl Into<Canned>) {
        self.inner.lock().unwrap().sts = response.into();
    }

    pub fn set_parse(&self, response: impl Into<Canned>) {
        self.inner.lock().unwrap().parse = response.into();
    }

    /// Status responses in order; the last one repeats
    pub fn set_statuses(&self, responses: Vec<Canned>) {
        self.inner.lock().unwrap().statuses = responses.into();
    }

    pub fn set_status_codes(&self, codes: &[i64]) {
        self.set_statuses(
            codes
                .iter()
                .map(|c| Canned::from(ok(json!({ "status": c }))))
                .collect(),
        );
    }

    pub fn set_submit(&self, response: impl Into<Canned>) {
        self.inner.lock().unwrap().submit = response.into();
    }

    pub fn set_oss_status(&self, status: u16) {
        self.inner.lock().unwrap().oss_status = status;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.inner.lock().unwrap().uploads.clone()
    }

    fn record(&self, endpoint: &'static str, params: HashMap<String, String>) {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(RecordedCall { endpoint, params });
    }

    fn next_status(&self) -> Canned {
        let mut inner = self.inner.lock().unwrap();
        if inner.statuses.len() > 1 {
            inner.statuses.pop_front().unwrap()
        } else {
            inner.statuses.front().cloned().unwrap_or_else(|| ok(json!({ "status": 1 })).into())
        }
    }
}

fn respond(canned: Canned) -> Response {
    let status = StatusCode::from_u16(canned.status).unwrap();
    (status, Json(canned.body)).into_response()
}

async fn sts(State(mock): State<MockCoohom>, Query(params): Query<HashMap<String, String>>) -> Response {
    mock.record("sts", params);
    let canned = mock.inner.lock().unwrap().sts.clone();
    respond(canned)
}

async fn parse(State(mock): State<MockCoohom>, Form(params): Form<HashMap<String, String>>) -> Response {
    mock.record("parse", params);
    let canned = mock.inner.lock().unwrap().parse.clone();
    respond(canned)
}

async fn status(State(mock): State<MockCoohom>, Query(params): Query<HashMap<String, String>>) -> Response {
    mock.record("status", params);
    respond(mock.next_status())
}

async fn submit(State(mock): State<MockCoohom>, Form(params): Form<HashMap<String, String>>) -> Response {
    mock.record("submit", params);
    let canned = mock.inner.lock().unwrap().submit.clone();
    respond(canned)
}

async fn oss_put(
    State(mock): State<MockCoohom>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let mut inner = mock.inner.lock().unwrap();
    inner.uploads.push(RecordedUpload {
        key,
        headers,
        body: body.to_vec(),
    });
    StatusCode::from_u16(inner.oss_status).unwrap()
}

/// Start the mock; returns its base URL
pub async fn spawn_mock(mock: MockCoohom) -> String {
    let app = Router::new()
        .route("/global/commodity/upload/sts", get(sts))
        .route("/global/commodity/upload/parse", post(parse))
        .route("/global/commodity/upload/status", get(status))
        .route("/global/commodity/upload/submit", post(submit))
        .route("/oss/*key", put(oss_put))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Real client pointed at the mock for both API and OSS
pub fn client_for(base_url: &str) -> CoohomClient {
    let store = OssObjectStore::with_endpoint(format!("{}/oss", base_url)).unwrap();
    CoohomClient::new(
        Credentials::new(APP_KEY, APP_SECRET),
        base_url,
        Duration::from_secs(5),
        Arc::new(store),
    )
    .unwrap()
}
