//! Join a room and play from the terminal.

use anyhow::{Context, Result};
use boardsync_client::{ClientError, GameClient, SessionConfig, Transport, WebSocketTransport};
use boardsync_core::{Color, SessionEvent, Square};
use boardsync_types::{MoveRequest, Promotion, UserId};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::render;

const HELP: &str = "\
commands:
  move e2e4[q]   request a move (promotion letter optional)
  resign         arm resignation (then 'confirm' or 'cancel')
  draw           arm a draw offer (then 'confirm' or 'cancel')
  accept         accept the opponent's draw offer
  decline        decline the opponent's draw offer
  start|prev|next|end   browse the game history
  board          show the board at the history cursor
  moves          list the moves, the one at the history cursor in brackets
  clock          show both clocks
  quit           leave the room";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request a move.
    Move(MoveRequest),
    /// Arm resignation.
    Resign,
    /// Arm a draw offer.
    Draw,
    /// Send the armed action.
    Confirm,
    /// Disarm the armed action.
    Cancel,
    /// Accept the pending draw offer.
    Accept,
    /// Decline the pending draw offer.
    Decline,
    /// History: first snapshot.
    Start,
    /// History: one back.
    Prev,
    /// History: one forward.
    Next,
    /// History: latest snapshot.
    End,
    /// Show the board.
    Board,
    /// List the moves played.
    Moves,
    /// Show the clocks.
    Clock,
    /// Print the command list.
    Help,
    /// Leave.
    Quit,
}

/// Input that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unrecognized command word.
    #[error("unknown command '{0}' (type 'help')")]
    Unknown(String),
    /// `move` without coordinates.
    #[error("usage: move e2e4[q]")]
    MissingMove,
    /// Coordinates could not be parsed.
    #[error("bad move '{0}': expected from and to squares like e2e4, optional promotion q/r/b/n")]
    BadMove(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "move" | "m" => {
                let text = words.next().ok_or(CommandError::MissingMove)?;
                Self::Move(parse_move(text)?)
            }
            "resign" => Self::Resign,
            "draw" => Self::Draw,
            "confirm" | "yes" => Self::Confirm,
            "cancel" | "no" => Self::Cancel,
            "accept" => Self::Accept,
            "decline" => Self::Decline,
            "start" => Self::Start,
            "prev" => Self::Prev,
            "next" => Self::Next,
            "end" => Self::End,
            "board" => Self::Board,
            "moves" => Self::Moves,
            "clock" => Self::Clock,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Parse `e2e4` or `e7e8q`.
fn parse_move(text: &str) -> Result<MoveRequest, CommandError> {
    let bad = || CommandError::BadMove(text.to_string());
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(bad());
    }
    let from = Square::parse(&text[0..2]).ok_or_else(bad)?;
    let to = Square::parse(&text[2..4]).ok_or_else(bad)?;
    let promotion = match text[4..].chars().next() {
        Some(letter) => Some(Promotion::from_letter(letter).ok_or_else(bad)?),
        None => None,
    };
    Ok(MoveRequest {
        from_row: from.row(),
        from_col: from.col(),
        to_row: to.row(),
        to_col: to.col(),
        promotion,
    })
}

/// Run the play command until the user quits or stdin closes.
pub async fn run(config: SessionConfig) -> Result<()> {
    let user_id = config.user_id;
    info!(room = %config.room_id, url = %config.url, "joining room");

    let mut client = GameClient::new(config, WebSocketTransport::new());
    let mut online = true;

    match client.connect().await {
        Ok(events) => show_events(&client, user_id, &events),
        Err(e) => {
            println!("{}", e);
            online = false;
        }
    }
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = client.next_events(), if online => match result {
                Ok(events) => show_events(&client, user_id, &events),
                Err(ClientError::ReconnectExhausted { attempts }) => {
                    println!("gave up after {} reconnect attempts; history is still browsable", attempts);
                    online = false;
                }
                Err(e) => {
                    println!("{}", e);
                    online = false;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = execute(&mut client, user_id, command).await {
                            println!("{}", e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    if let Err(e) = client.close().await {
        debug!(error = %e, "close failed");
    }
    Ok(())
}

async fn execute<T: Transport>(
    client: &mut GameClient<T>,
    user_id: UserId,
    command: Command,
) -> Result<(), ClientError> {
    match command {
        Command::Move(mv) => client.send_move(mv).await?,
        Command::Resign => {
            client.request_resign()?;
            println!("resign? type 'confirm' or 'cancel'");
        }
        Command::Draw => {
            client.request_draw_offer()?;
            println!("offer a draw? type 'confirm' or 'cancel'");
        }
        Command::Confirm => client.confirm_action().await?,
        Command::Cancel => {
            if client.dismiss_action().is_none() {
                println!("nothing to cancel");
            }
        }
        Command::Accept | Command::Decline => {
            let Some(offer_id) = client.pending_offer().map(|o| o.offer_id.clone()) else {
                println!("no draw offer pending");
                return Ok(());
            };
            let sent = if command == Command::Accept {
                client.accept_draw(&offer_id).await?
            } else {
                client.decline_draw(&offer_id).await?
            };
            if !sent {
                println!("draw offer no longer pending");
            }
        }
        Command::Start | Command::Prev | Command::Next | Command::End => {
            let Some(history) = client.history_mut() else {
                println!("no game state yet");
                return Ok(());
            };
            match command {
                Command::Start => history.start(),
                Command::Prev => history.previous(),
                Command::Next => history.next(),
                _ => history.end(),
            };
            show_board(client, user_id);
        }
        Command::Board => show_board(client, user_id),
        Command::Moves => show_moves(client),
        Command::Clock => show_clock(client, user_id),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn show_events<T: Transport>(client: &GameClient<T>, user_id: UserId, events: &[SessionEvent]) {
    for event in events {
        println!("{}", render::event(event));
        match event {
            SessionEvent::StateSynced { .. } | SessionEvent::BoardUpdated { .. } => {
                let following = client
                    .session()
                    .history()
                    .map_or(true, |h| h.is_following());
                if following {
                    show_board(client, user_id);
                    show_clock(client, user_id);
                }
            }
            _ => {}
        }
    }
}

fn show_board<T: Transport>(client: &GameClient<T>, user_id: UserId) {
    let session = client.session();
    let Some(history) = session.history() else {
        println!("no game state yet");
        return;
    };
    let flipped = session
        .roster()
        .and_then(|r| r.by_user(user_id))
        .is_some_and(|p| p.color == Color::Black);

    println!();
    print!("{}", render::board(history.current(), flipped));
    println!(
        "ply {}/{}{}",
        history.cursor(),
        history.len() - 1,
        if history.is_following() { "" } else { " (browsing)" }
    );
    print!("{}", render::summary(history.current()));
}

fn show_moves<T: Transport>(client: &GameClient<T>) {
    let session = client.session();
    let entries = session.moves();
    let current = session
        .history()
        .and_then(|h| render::current_half_move(entries, h.len(), h.cursor()));
    print!("{}", render::moves(entries, current));
}

fn show_clock<T: Transport>(client: &GameClient<T>, user_id: UserId) {
    match client.display_clock() {
        Some(clock) => println!(
            "{}",
            render::clocks(&clock, client.session().roster(), Some(user_id))
        ),
        None => println!("no clock yet"),
    }
}
