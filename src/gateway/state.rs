use std::sync::Arc;

use crate::pipeline::Verifier;

#[derive(Clone)]
pub struct HandlerState {
    pub verifier: Arc<Verifier>,
}

impl HandlerState {
    pub fn new(verifier: Arc<Verifier>) -> Self {
        Self { verifier }
    }
}
