use crate::{error::UploadError, models::ResumableQuery, network::HttpClient};
use async_trait::async_trait;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub identifier: Uuid,
    pub chunk_number: usize,
    pub body: Option<Vec<u8>>,
}

type Responder = Box<dyn Fn(&ResumableQuery) -> Result<u16, UploadError> + Send + Sync>;

pub struct MockHttp {
    requests: Mutex<Vec<Recorded>>,
    on_get: Responder,
    on_post: Responder,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockHttp {
    /// Probes answer 404, uploads answer 200.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            on_get: Box::new(|_| Ok(404)),
            on_post: Box::new(|_| Ok(200)),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn on_get<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResumableQuery) -> Result<u16, UploadError> + Send + Sync + 'static,
    {
        self.on_get = Box::new(f);
        self
    }

    pub fn on_post<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResumableQuery) -> Result<u16, UploadError> + Send + Sync + 'static,
    {
        self.on_post = Box::new(f);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn count_for(&self, method: Method, chunk_number: usize) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.chunk_number == chunk_number)
            .count()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn exchange(
        &self,
        method: Method,
        query: &ResumableQuery,
        body: Option<Vec<u8>>,
    ) -> Result<u16, UploadError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests.lock().unwrap().push(Recorded {
            method,
            identifier: query.identifier,
            chunk_number: query.chunk_number,
            body,
        });
        let result = match method {
            Method::Get => (self.on_get)(query),
            Method::Post => (self.on_post)(query),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(&self, _url: &str, query: &ResumableQuery) -> Result<u16, UploadError> {
        self.exchange(Method::Get, query, None).await
    }

    async fn post(
        &self,
        _url: &str,
        query: &ResumableQuery,
        data: Vec<u8>,
    ) -> Result<u16, UploadError> {
        self.exchange(Method::Post, query, Some(data)).await
    }
}
