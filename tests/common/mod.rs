//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use codio_grader::oracle::{Oracle, OracleError};

/// A deterministic oracle: replays scripted replies in order, repeating the
/// last one once the script runs out.
pub struct StubOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    last:    Mutex<Option<Result<String, OracleError>>>,
    delay:   Option<Duration>,
    calls:   Mutex<Vec<(String, String)>>,
}

impl StubOracle {
    pub fn replying(reply: &str) -> Arc<Self> {
        Self::scripted(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: OracleError) -> Arc<Self> {
        Self::scripted(vec![Err(error)])
    }

    pub fn scripted(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last:    Mutex::new(None),
            delay:   None,
            calls:   Mutex::new(Vec::new()),
        })
    }

    pub fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Ok(reply.to_string())])),
            last:    Mutex::new(None),
            delay:   Some(delay),
            calls:   Mutex::new(Vec::new()),
        })
    }

    /// `(system_prompt, user_content)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String, OracleError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_content.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or(Err(OracleError::Other("stub has no replies".into()))),
        }
    }
}

/// Returns false (and says so) when no Python interpreter is available, so
/// execution tests can skip themselves.
pub fn python_available() -> bool {
    let found = codio_grader::util::python_path(None).is_ok();
    if !found {
        eprintln!("skipping: no python interpreter on PATH");
    }
    found
}
