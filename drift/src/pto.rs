//! Wrapper around `pt-online-schema-change` for long-running alterations on
//! live tables. The tool receives the ALTER body with the leading
//! `ALTER TABLE name` stripped; stdout and stderr are streamed to the log and
//! retained as the step output.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::info;

use crate::error::{EngineError, Result};

pub const PTO_COMMAND: &str = "pt-online-schema-change";
pub const CRITICAL_LOAD: &str = "Threads_running=500";

/// Split an `ALTER TABLE name <body>` statement into the table name and the
/// body the online tool expects.
pub fn split_alter(statement: &str) -> Result<(String, String)> {
    let rest = statement
        .strip_prefix("ALTER TABLE ")
        .ok_or_else(|| EngineError::NotAlter(statement.to_owned()))?;

    let mut parts = rest.splitn(2, ' ');
    let table = parts.next().unwrap_or_default().to_owned();
    let inner = parts
        .next()
        .map(str::trim)
        .filter(|inner| !inner.is_empty())
        .ok_or_else(|| EngineError::NotAlter(statement.to_owned()))?;

    Ok((table, inner.to_owned()))
}

#[derive(Debug, Clone)]
pub struct PtoRunner {
    pub database: String,
}

impl PtoRunner {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn args(&self, table: &str, alter: &str) -> Vec<String> {
        vec![
            format!("D={}", self.database),
            format!("t={table}"),
            "--alter".to_owned(),
            alter.to_owned(),
            "--critical-load".to_owned(),
            CRITICAL_LOAD.to_owned(),
            "--execute".to_owned(),
        ]
    }

    /// The command line as it would be typed; dryrun output.
    pub fn command_line(&self, table: &str, alter: &str) -> String {
        format!(
            "{PTO_COMMAND} D={} t={table} --alter \"{alter}\" --critical-load \"{CRITICAL_LOAD}\" --execute",
            self.database
        )
    }

    pub async fn run(&self, table: &str, alter: &str) -> Result<String> {
        let mut child = Command::new(PTO_COMMAND)
            .args(self.args(table, alter))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out, err, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());

        let mut output = out?;
        output.push_str(&err?);

        if !status?.success() {
            return Err(EngineError::Execution {
                step: self.command_line(table, alter),
                output,
            });
        }

        Ok(output)
    }
}

async fn drain<R>(pipe: Option<R>) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut text = String::new();

    if let Some(pipe) = pipe {
        let mut lines = BufReader::new(pipe).lines();

        while let Some(line) = lines.next_line().await? {
            info!("{line}");
            text.push_str(&line);
            text.push('\n');
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_strips_the_alter_prefix() {
        let (table, inner) =
            split_alter("ALTER TABLE test ADD COLUMN age int(11) NOT NULL").unwrap();

        assert_eq!(table, "test");
        assert_eq!(inner, "ADD COLUMN age int(11) NOT NULL");
    }

    #[test]
    fn non_alter_statements_are_rejected() {
        assert!(matches!(
            split_alter("DROP TABLE test"),
            Err(EngineError::NotAlter(_))
        ));
        assert!(matches!(
            split_alter("ALTER TABLE test"),
            Err(EngineError::NotAlter(_))
        ));
    }

    #[test]
    fn args_match_the_tool_contract() {
        let runner = PtoRunner::new("shop_prod");

        assert_eq!(
            runner.args("test", "ADD COLUMN age int(11) NOT NULL"),
            vec![
                "D=shop_prod",
                "t=test",
                "--alter",
                "ADD COLUMN age int(11) NOT NULL",
                "--critical-load",
                "Threads_running=500",
                "--execute",
            ]
        );
    }

    #[test]
    fn command_line_is_printable() {
        let runner = PtoRunner::new("shop_prod");

        assert_eq!(
            runner.command_line("test", "DROP COLUMN age"),
            "pt-online-schema-change D=shop_prod t=test --alter \"DROP COLUMN age\" \
             --critical-load \"Threads_running=500\" --execute"
        );
    }
}
