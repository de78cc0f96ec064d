//! Running external sink programs

use std::process::Stdio;

use tokio::process::Command;

use crate::error::SinkError;

/// Run `program` with `args` to completion.
///
/// Output is discarded. The child is killed if the returned future is
/// dropped, so an outer timeout does not leak processes.
pub(crate) async fn run(program: &str, args: &[String]) -> Result<(), SinkError> {
    tracing::trace!("Running {} {:?}", program, args);

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| SinkError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(SinkError::ExitStatus {
            program: program.to_string(),
            status: status.to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_program() {
        assert!(run("true", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_program() {
        let error = run("false", &[]).await.unwrap_err();
        assert!(matches!(error, SinkError::ExitStatus { ref program, .. } if program == "false"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let error = run("tracknotify-no-such-program", &[]).await.unwrap_err();
        assert!(matches!(error, SinkError::Spawn { .. }));
    }
}
