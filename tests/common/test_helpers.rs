#![allow(dead_code)]

use http::Request;
use std::sync::{Arc, Mutex};
use taskgate::access::{AccessResolver, InMemoryAccessStore, Resource};
use taskgate::clock::ManualClock;
use tracing_subscriber::fmt::MakeWriter;

/// Store with `alice` owning `task-1` and `task-2`, plus `bob` and `carol` as known principals.
pub async fn seeded_store() -> InMemoryAccessStore {
    let store = InMemoryAccessStore::new();
    store.insert_resource(Resource::new("task-1", "alice")).await;
    store.insert_resource(Resource::new("task-2", "alice")).await;
    store.insert_principal("bob").await;
    store.insert_principal("carol").await;
    store
}

pub async fn seeded_resolver() -> (AccessResolver<InMemoryAccessStore>, ManualClock) {
    let clock = ManualClock::starting_at(1_700_000_000_000);
    let resolver = AccessResolver::new(seeded_store().await).with_clock(clock.clone());
    (resolver, clock)
}

/// Empty-bodied GET request carrying a single header.
pub fn request_with_header(name: &'static str, value: &str) -> Request<String> {
    Request::builder()
        .uri("/tasks")
        .header(name, value)
        .body(String::new())
        .expect("valid request")
}

pub fn bare_request() -> Request<String> {
    Request::builder().uri("/tasks").body(String::new()).expect("valid request")
}

/// Log sink for asserting on `tracing` output.
#[derive(Clone, Default)]
pub struct SharedWriter(pub Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedGuard;
    fn make_writer(&'a self) -> Self::Writer {
        SharedGuard(self.0.clone())
    }
}

pub struct SharedGuard(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
