//! Console command reader

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::{Command, SessionEvent};

/// Controls shown at startup
pub const HELP: &str =
    "r=reload s=shoot t=stab b=block c=counter | start, next, exit";

/// Read commands from stdin until EOF or until the duel loop is gone
pub async fn read_stdin(events_tx: mpsc::Sender<SessionEvent>) {
    read_commands(BufReader::new(tokio::io::stdin()), events_tx).await;
}

/// Forward one command per line. Blank lines are skipped, unknown input is logged.
pub async fn read_commands<R>(reader: R, events_tx: mpsc::Sender<SessionEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Input closed");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if events_tx.send(SessionEvent::Command(command)).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "{HELP}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Move;

    #[tokio::test]
    async fn forwards_parsed_commands() {
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"start\n\nbogus\nS\nquit\n";
        read_commands(input, tx).await;

        let mut commands = Vec::new();
        while let Some(SessionEvent::Command(command)) = rx.recv().await {
            commands.push(command);
        }
        assert_eq!(
            commands,
            vec![
                Command::StartMatch,
                Command::Select(Move::Shoot),
                Command::Exit
            ]
        );
    }
}
