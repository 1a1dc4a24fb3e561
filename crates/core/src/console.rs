use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// The serial line the suite prints to. Clones share one transcript, so the
/// main flow, the USART wire and interrupt handlers all append to the same
/// log in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SerialConsole {
    sink: Arc<Mutex<Vec<u8>>>,
    echo_stdout: bool,
}

impl SerialConsole {
    pub fn new(echo_stdout: bool) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Vec::new())),
            echo_stdout,
        }
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        if let Ok(mut guard) = self.sink.lock() {
            guard.extend_from_slice(bytes);
        }

        if self.echo_stdout {
            let mut out = io::stdout().lock();
            #[allow(unused_must_use)]
            {
                out.write_all(bytes);
                out.flush();
            }
        }
    }

    pub fn push(&self, byte: u8) {
        self.push_bytes(&[byte]);
    }

    pub fn contents(&self) -> Vec<u8> {
        self.sink.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Transcript as text; non-UTF-8 bytes from the wire are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.sink.lock() {
            guard.clear();
        }
    }
}

impl std::fmt::Write for SerialConsole {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}
