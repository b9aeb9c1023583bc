use crate::domain::models::token::DeviceCode;
use crate::domain::ports::{Clock, UserPrompt};
use anyhow::{Context, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Prints the device code on stdout and waits for Enter on stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl UserPrompt for TerminalPrompt {
    fn acknowledge(&self, code: &DeviceCode) -> Result<(), Error> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "Please go to {} and enter the code: {}",
            code.verification_uri, code.user_code
        )?;
        writeln!(stdout, "This code will expire in {} seconds.", code.expires_in)?;
        write!(stdout, "Press Enter to continue after you have authorized the app.")?;
        stdout.flush()?;
        drop(stdout);

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read acknowledgement from stdin")?;
        Ok(())
    }
}
