use super::*;
use crate::board::{Board, Outcome, Player};
use crate::protocol::{INFO_OPPONENT_DISCONNECTED, INFO_WAITING};
use crate::state::test_helpers;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(state: AppState) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let addr = listener.local_addr().expect("listener should have an address");
    let app = crate::routes::app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    addr
}

async fn try_connect(addr: std::net::SocketAddr, match_id: &str, pid: Option<&str>) -> Result<Client, tungstenite::Error> {
    let mut req = format!("ws://{addr}/ws/{match_id}")
        .into_client_request()
        .expect("request should build");
    if let Some(pid) = pid {
        req.headers_mut()
            .insert("cookie", format!("pid={pid}").parse().expect("header should parse"));
    }
    tokio_tungstenite::connect_async(req).await.map(|(ws, _)| ws)
}

async fn connect(addr: std::net::SocketAddr, match_id: &MatchId, pid: &str) -> Client {
    try_connect(addr, &match_id.to_string(), Some(pid))
        .await
        .expect("websocket connect should succeed")
}

async fn recv(ws: &mut Client) -> ServerMessage {
    loop {
        let msg = timeout(Duration::from_millis(1000), ws.next())
            .await
            .expect("server message timed out")
            .expect("stream ended")
            .expect("read should succeed");
        match msg {
            WsMessage::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("server message should parse");
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn assert_silent(ws: &mut Client) {
    assert!(
        timeout(Duration::from_millis(150), ws.next()).await.is_err(),
        "expected no server message"
    );
}

async fn assert_closed(ws: &mut Client) {
    loop {
        match timeout(Duration::from_millis(1000), ws.next())
            .await
            .expect("close timed out")
        {
            None | Some(Err(_) | Ok(WsMessage::Close(_))) => return,
            Some(Ok(WsMessage::Text(text))) => panic!("expected close, got {text}"),
            Some(Ok(_)) => {}
        }
    }
}

async fn send_board(ws: &mut Client, values: [i64; 9]) {
    let json = serde_json::to_string(&values).expect("board should serialize");
    ws.send(WsMessage::Text(json.into())).await.expect("send should succeed");
}

/// Plain HTTP/1.1 GET carrying a `pid` cookie. Returns the raw response.
async fn http_get(addr: std::net::SocketAddr, path: &str, pid: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("http connect should succeed");
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nCookie: pid={pid}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.expect("http write should succeed");
    let mut response = String::new();
    timeout(Duration::from_millis(1000), stream.read_to_string(&mut response))
        .await
        .expect("http response timed out")
        .expect("http read should succeed");
    response
}

fn state_msg(values: [i64; 9], result: Outcome, next_move: Player) -> ServerMessage {
    ServerMessage::game_state(Board::from_values(&values).expect("valid board"), result, next_move)
}

struct Seated {
    state: AppState,
    addr: std::net::SocketAddr,
    match_id: MatchId,
    alice: Client,
    bob: Client,
}

/// Create as alice, connect alice, bob opens the match page, connect bob,
/// drain handshake.
async fn two_player_match() -> Seated {
    let state = test_helpers::test_app_state();
    let addr = spawn_server(state.clone()).await;
    let match_id = services::registry::create(&state, "alice").await.unwrap();

    let mut alice = connect(addr, &match_id, "alice").await;
    assert_eq!(recv(&mut alice).await, ServerMessage::info(INFO_WAITING));

    let page = http_get(addr, &format!("/gb/{match_id}"), "bob").await;
    assert!(page.starts_with("HTTP/1.1 200"), "unexpected page response: {page}");
    assert!(page.contains(r#""play_value":2"#), "bob should be seated second: {page}");
    assert!(!page.to_ascii_lowercase().contains("set-cookie"), "existing pid should be kept: {page}");
    let mut bob = connect(addr, &match_id, "bob").await;

    let initial = state_msg([0; 9], Outcome::Ongoing, Player::One);
    assert_eq!(recv(&mut alice).await, initial);
    assert_eq!(recv(&mut bob).await, initial);
    Seated { state, addr, match_id, alice, bob }
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn index_over_http_keeps_request_pid() {
    let state = test_helpers::test_app_state();
    let addr = spawn_server(state).await;

    let response = http_get(addr, "/", "alice123").await;
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
    assert!(response.contains(r#""player_id":"alice123""#));
    assert!(!response.to_ascii_lowercase().contains("set-cookie"));
}

// =============================================================================
// UPGRADE
// =============================================================================

#[tokio::test]
async fn upgrade_refused_for_unknown_match() {
    let state = test_helpers::test_app_state();
    let addr = spawn_server(state).await;

    let err = try_connect(addr, "missing", Some("alice")).await.unwrap_err();
    assert!(matches!(err, tungstenite::Error::Http(resp) if resp.status() == 404));
}

#[tokio::test]
async fn upgrade_refused_without_identity() {
    let state = test_helpers::test_app_state();
    let match_id = test_helpers::seed_match(&state, "m1", "alice").await;
    let addr = spawn_server(state).await;

    let err = try_connect(addr, &match_id.to_string(), None).await.unwrap_err();
    assert!(matches!(err, tungstenite::Error::Http(resp) if resp.status() == 401));
}

// =============================================================================
// GAMEPLAY
// =============================================================================

#[tokio::test]
async fn first_move_reaches_both_players() {
    let Seated { mut alice, mut bob, .. } = two_player_match().await;

    send_board(&mut alice, [1, 0, 0, 0, 0, 0, 0, 0, 0]).await;

    let expected = state_msg([1, 0, 0, 0, 0, 0, 0, 0, 0], Outcome::Ongoing, Player::Two);
    assert_eq!(recv(&mut alice).await, expected);
    assert_eq!(recv(&mut bob).await, expected);
}

#[tokio::test]
async fn out_of_turn_move_is_ignored() {
    let Seated { mut alice, mut bob, .. } = two_player_match().await;

    send_board(&mut bob, [0, 0, 0, 0, 2, 0, 0, 0, 0]).await;
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;

    send_board(&mut alice, [0, 1, 0, 0, 0, 0, 0, 0, 0]).await;
    let expected = state_msg([0, 1, 0, 0, 0, 0, 0, 0, 0], Outcome::Ongoing, Player::Two);
    assert_eq!(recv(&mut alice).await, expected);
    assert_eq!(recv(&mut bob).await, expected);
}

#[tokio::test]
async fn full_game_reports_winner() {
    let Seated { mut alice, mut bob, .. } = two_player_match().await;
    let moves: [(bool, [i64; 9]); 5] = [
        (true, [1, 0, 0, 0, 0, 0, 0, 0, 0]),
        (false, [1, 0, 0, 2, 0, 0, 0, 0, 0]),
        (true, [1, 1, 0, 2, 0, 0, 0, 0, 0]),
        (false, [1, 1, 0, 2, 2, 0, 0, 0, 0]),
        (true, [1, 1, 1, 2, 2, 0, 0, 0, 0]),
    ];

    let mut last = None;
    for (by_alice, values) in moves {
        let mover = if by_alice { &mut alice } else { &mut bob };
        send_board(mover, values).await;
        recv(&mut bob).await;
        last = Some(recv(&mut alice).await);
    }

    assert_eq!(last, Some(state_msg([1, 1, 1, 2, 2, 0, 0, 0, 0], Outcome::Winner(Player::One), Player::Two)));
}

// =============================================================================
// CONNECTION LIFECYCLE
// =============================================================================

#[tokio::test]
async fn reconnect_replaces_previous_connection() {
    let Seated { addr, match_id, mut alice, mut bob, .. } = two_player_match().await;

    let mut alice_again = connect(addr, &match_id, "alice").await;
    let initial = state_msg([0; 9], Outcome::Ongoing, Player::One);
    assert_eq!(recv(&mut alice_again).await, initial);
    assert_eq!(recv(&mut bob).await, initial);
    assert_closed(&mut alice).await;

    // Only the new connection is addressed from now on.
    send_board(&mut alice_again, [0, 0, 0, 0, 1, 0, 0, 0, 0]).await;
    let expected = state_msg([0, 0, 0, 0, 1, 0, 0, 0, 0], Outcome::Ongoing, Player::Two);
    assert_eq!(recv(&mut alice_again).await, expected);
    assert_eq!(recv(&mut bob).await, expected);

    // The displaced connection closing must not tell bob anything.
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn disconnect_notifies_other_player() {
    let Seated { mut alice, mut bob, .. } = two_player_match().await;

    bob.close(None).await.expect("close should send");

    assert_eq!(recv(&mut alice).await, ServerMessage::info(INFO_OPPONENT_DISCONNECTED));
}

#[tokio::test]
async fn undecodable_message_ends_connection() {
    let Seated { mut alice, mut bob, .. } = two_player_match().await;

    bob.send(WsMessage::Text("not a board".into())).await.expect("send should succeed");

    assert_closed(&mut bob).await;
    assert_eq!(recv(&mut alice).await, ServerMessage::info(INFO_OPPONENT_DISCONNECTED));
}

#[tokio::test]
async fn unaffiliated_connection_cannot_move() {
    let Seated { state, addr, match_id, mut alice, mut bob } = two_player_match().await;

    let mut mallory = connect(addr, &match_id, "mallory").await;
    send_board(&mut mallory, [1, 0, 0, 0, 0, 0, 0, 0, 0]).await;

    assert_silent(&mut mallory).await;
    assert_silent(&mut alice).await;
    assert_silent(&mut bob).await;
    let game = test_helpers::lookup(&state, &match_id).await;
    assert_eq!(game.lock().await.board, Board::new());
}
