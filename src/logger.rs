use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::utils::find_char_boundary;

/// Append-only session log. A disabled logger accepts every call and writes nothing.
#[derive(Debug, Clone)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionMetrics {
    pub logins: usize,
    pub failed_logins: usize,
    pub total_queries: usize,
    pub answered: usize,
    pub api_errors: usize,
    pub network_errors: usize,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_rate(&self) -> f64 {
        if self.total_queries == 0 {
            return 0.0;
        }
        (self.answered as f64 / self.total_queries as f64) * 100.0
    }

    pub fn display(&self) {
        use colored::Colorize;
        println!("\n{}", "━━━━━━━━━ Session Statistics ━━━━━━━━━".bright_cyan().bold());
        println!("Logins: {} ({} failed)", self.logins, self.failed_logins.to_string().red());
        println!("Questions asked: {}", self.total_queries);
        println!("Answered: {}", self.answered.to_string().green());
        println!("API errors: {}", self.api_errors.to_string().yellow());
        println!("Network errors: {}", self.network_errors.to_string().red());
        println!("Answer rate: {:.1}%", self.answer_rate());
        println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self {
            log_file: Some(log_file),
        })
    }

    pub fn disabled() -> Self {
        Self { log_file: None }
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let Some(path) = &self.log_file else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_login(&self, username: &str, campus: &str) -> Result<()> {
        self.log(&format!("LOGIN ATTEMPT: user={} campus={}", username, campus))
    }

    pub fn log_login_result(&self, username: &str, outcome: &str) -> Result<()> {
        self.log(&format!("LOGIN {}: user={}", outcome, username))
    }

    pub fn log_query(&self, request_id: u64, question: &str) -> Result<()> {
        self.log(&format!("QUERY #{}: {}", request_id, question))
    }

    pub fn log_answer(&self, request_id: u64, answer: &str) -> Result<()> {
        let preview = if answer.len() > 200 {
            format!("{}...", &answer[..find_char_boundary(answer, 200)])
        } else {
            answer.to_string()
        };
        self.log(&format!("ANSWER #{}: {}", request_id, preview))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}
