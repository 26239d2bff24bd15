use std::collections::VecDeque;

use super::{ConnectionError, FailureKind, LineTransport};

/// Scripted transport for tests and dry runs.
///
/// Inbound lines are handed out one per poll while the link is open; outbound
/// lines are recorded only while it is open, matching a real port.
#[derive(Debug, Default)]
pub struct FakeTransport {
    script: VecDeque<String>,
    writes: Vec<String>,
    open: bool,
    device: Option<String>,
    fail_open: Option<FailureKind>,
}

impl FakeTransport {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A fake that starts out connected.
    pub fn connected<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fake = Self::new(script);
        fake.open = true;
        fake
    }

    /// Queue more inbound text. Multi-line chunks are split on `\n`.
    pub fn push_inbound(&mut self, chunk: &str) {
        self.script.extend(chunk.split('\n').map(str::to_string));
    }

    /// Make subsequent `open` calls fail with `kind`.
    pub fn fail_open_with(&mut self, kind: FailureKind) {
        self.fail_open = Some(kind);
    }

    pub fn clear_open_failure(&mut self) {
        self.fail_open = None;
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    pub fn take_writes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.writes)
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn pending_inbound(&self) -> usize {
        self.script.len()
    }
}

impl LineTransport for FakeTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self, port: Option<&str>) -> Result<(), ConnectionError> {
        if let Some(device) = port {
            self.device = Some(device.to_string());
        }
        if let Some(kind) = self.fail_open {
            self.open = false;
            return Err(ConnectionError::new(
                self.device.clone().unwrap_or_else(|| "fake".into()),
                kind,
                "scripted open failure",
            ));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn poll_line(&mut self) -> Option<String> {
        if !self.open {
            return None;
        }
        while let Some(raw) = self.script.pop_front() {
            let line = raw.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
        None
    }

    fn send_line(&mut self, text: &str) {
        if self.open {
            self.writes.push(text.to_string());
        }
    }
}
