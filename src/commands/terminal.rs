//! Терминальная оболочка: строки из stdin вместо кнопок, вывод в stdout.

use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::logger::TerminalSink;
use crate::peer::connection::{PeerLink, RtcPeer};
use crate::session::Session;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
commands:
  /open            open a data channel (this side becomes the caller)
  /signal <text>   submit a payload pasted from the other peer
  /chat <text>     send a chat message over the open channel
  /help            show this text
  /quit            close the connection and exit
a line starting with '{' is a signal, any other line is a chat message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Open,
    Signal(String),
    Chat(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    /// Пробелы по краям важны только для распознавания команды: чат уходит как есть
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ShellCommand::Empty;
        }
        if trimmed.starts_with('{') {
            return ShellCommand::Signal(trimmed.to_string());
        }
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return ShellCommand::Chat(line.to_string());
        };

        // после имени команды отрезаем ровно один разделитель
        let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match name {
            "open" => ShellCommand::Open,
            "signal" => ShellCommand::Signal(arg.trim().to_string()),
            // сообщение уходит как есть, включая пустое
            "chat" => ShellCommand::Chat(arg.to_string()),
            "help" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            other => ShellCommand::Unknown(other.to_string()),
        }
    }
}

/// Выполняет одну команду. `false` когда пользователь попросил выйти.
///
/// Ошибки уже выведены сессией, сюда они не возвращаются.
pub async fn dispatch<P: PeerLink>(session: &mut Session<P>, command: ShellCommand) -> bool {
    match command {
        ShellCommand::Open => {
            let _ = session.open_channel().await;
        }
        ShellCommand::Signal(text) => {
            let _ = session.submit_signal(&text).await;
        }
        ShellCommand::Chat(text) => {
            let _ = session.send_chat(&text).await;
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => return false,
        ShellCommand::Empty => {}
        ShellCommand::Unknown(name) => println!("unknown command '/{}', try /help", name),
    }
    true
}

/// Главный цикл: пользовательский ввод и события платформы по очереди, в одной задаче
pub async fn run(config: RelayConfig) -> Result<(), RelayError> {
    let (tx, mut events) = mpsc::unbounded_channel();
    let peer = RtcPeer::new(&config, tx).await?;
    let mut session = Session::new(peer, config, Arc::new(TerminalSink));
    log::info!("Session {} ready", session.id());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !dispatch(&mut session, ShellCommand::parse(&line)).await {
                    break;
                }
            }
            Some(event) = events.recv() => session.handle_event(event).await,
        }
    }

    session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogKind, MemorySink};
    use crate::testing::{pump, PeerCall, ScriptedPeer};

    #[test]
    fn parse_commands() {
        assert_eq!(ShellCommand::parse("/open"), ShellCommand::Open);
        assert_eq!(ShellCommand::parse("  /quit "), ShellCommand::Quit);
        assert_eq!(
            ShellCommand::parse("/chat hello there"),
            ShellCommand::Chat("hello there".into())
        );
        assert_eq!(
            ShellCommand::parse("/signal H4sIAAAA"),
            ShellCommand::Signal("H4sIAAAA".into())
        );
        assert_eq!(ShellCommand::parse("/frobnicate"), ShellCommand::Unknown("frobnicate".into()));
        assert_eq!(ShellCommand::parse("   "), ShellCommand::Empty);
    }

    #[test]
    fn bare_lines() {
        assert_eq!(
            ShellCommand::parse(r#"{"candidate":"c"}"#),
            ShellCommand::Signal(r#"{"candidate":"c"}"#.into())
        );
        assert_eq!(ShellCommand::parse("hi"), ShellCommand::Chat("hi".into()));
    }

    #[test]
    fn chat_text_is_verbatim() {
        assert_eq!(
            ShellCommand::parse("  indented reply  "),
            ShellCommand::Chat("  indented reply  ".into())
        );
        assert_eq!(
            ShellCommand::parse("/chat   two leading, one trailing "),
            ShellCommand::Chat("  two leading, one trailing ".into())
        );
        assert_eq!(
            ShellCommand::parse("  /chat\ttab separated"),
            ShellCommand::Chat("tab separated".into())
        );
        assert_eq!(ShellCommand::parse("/chat "), ShellCommand::Chat("".into()));
        assert_eq!(
            ShellCommand::parse("/signal   H4sIAAAA  "),
            ShellCommand::Signal("H4sIAAAA".into())
        );
    }

    #[tokio::test]
    async fn dispatch_drives_session() {
        let (peer, mut events) = ScriptedPeer::new("caller");
        let sink = MemorySink::new();
        let mut session = Session::new(peer, RelayConfig::default(), sink.clone());

        assert!(dispatch(&mut session, ShellCommand::Open).await);
        pump(&mut session, &mut events).await;
        assert_eq!(
            session.peer().calls()[0],
            PeerCall::CreateDataChannel("chat".into())
        );
        assert_eq!(sink.of_kind(LogKind::Relay).len(), 1);

        assert!(dispatch(&mut session, ShellCommand::Chat("early".into())).await);
        assert_eq!(sink.of_kind(LogKind::Failure).len(), 1);

        assert!(!dispatch(&mut session, ShellCommand::Quit).await);
    }
}
