// src/utils/error_logger.rs
use std::collections::VecDeque;

use log::error;

// Maximum number of errors to keep in history
pub const MAX_ERROR_HISTORY: usize = 100;

// Bounded history of generation failures. Every entry is also forwarded to the log.
#[derive(Debug)]
pub struct ErrorLogger {
    history: VecDeque<String>,
    capacity: usize,
}

impl ErrorLogger {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ERROR_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ErrorLogger {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn log_error(&mut self, module: &str, message: &str) {
        let error_message = format!("[{}] {}", module, message);
        error!("{}", error_message);

        self.history.push_back(error_message);
        // Remove oldest if exceeding capacity
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    pub fn get_error_history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn error_count(&self) -> usize {
        self.history.len()
    }
}

impl Default for ErrorLogger {
    fn default() -> Self {
        Self::new()
    }
}
