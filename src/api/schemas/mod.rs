use serde::Serialize;

pub mod auth;
pub mod cards;

/// Success envelope shared by every endpoint: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}
