//! Integration tests for the command client against a scripted server.
//!
//! The mock server plays the game server's side of the protocol over a
//! real loopback socket: it mints a fresh random token for every challenge
//! request, accepts each token once, checks the password, and answers each
//! opcode the way the real server does.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use uorcon_client::{ClientConfig, ClientError, CommandOutcome, RconClient};
use uorcon_protocol::{
    Arg, Challenge, Coordinates, OnlineUser, Opcode, Rejection, Request, StatusReport,
};

const PASSWORD: &str = "secret";

// =========================================================================
// Mock server
// =========================================================================

#[derive(Default)]
struct ServerLog {
    challenges_issued: Vec<Challenge>,
    challenges_used: HashSet<Challenge>,
    commands: Vec<Request>,
}

struct MockServer {
    addr: SocketAddr,
    log: Arc<Mutex<ServerLog>>,
}

impl MockServer {
    async fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let log = Arc::new(Mutex::new(ServerLog::default()));

        let task_log = Arc::clone(&log);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let reply = respond(&buf[..len], &task_log);
                let _ = socket.send_to(&reply, from).await;
            }
        });

        Self { addr, log }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig {
            host: "127.0.0.1".into(),
            port: self.addr.port(),
            password: PASSWORD.into(),
            timeout_ms: 2000,
            ..ClientConfig::default()
        }
    }

    async fn client(&self) -> RconClient {
        RconClient::connect(&self.config()).await.unwrap()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, ServerLog> {
        self.log.lock().unwrap()
    }
}

fn respond(datagram: &[u8], log: &Mutex<ServerLog>) -> Vec<u8> {
    let Ok(request) = Request::decode(datagram) else {
        return vec![0xFF];
    };

    match request.opcode {
        Opcode::Challenge => {
            let token: [u8; 8] = rand::random();
            log.lock().unwrap().challenges_issued.push(Challenge::new(token));
            let mut reply = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0A, 0x20];
            reply.extend_from_slice(&token);
            reply.extend_from_slice(&[0x20, 0x32, 0x0A]);
            return reply;
        }
        Opcode::KeepAlive => return vec![0x0A],
        _ => {}
    }

    {
        let mut log = log.lock().unwrap();
        let Some(challenge) = request.challenge else {
            return vec![0xF0];
        };
        let known = log.challenges_issued.contains(&challenge);
        if !known || !log.challenges_used.insert(challenge) {
            return vec![0xF0];
        }
        if request.password.as_deref() != Some(PASSWORD) {
            return vec![0xF1];
        }
        log.commands.push(request.clone());
    }

    match request.opcode {
        Opcode::ChannelChat => match request.args.first() {
            Some(Arg::Str(channel)) if channel == "General" => vec![0x0A],
            _ => vec![0xFF],
        },
        Opcode::Status => StatusReport {
            shard: "TestShard".into(),
            characters: 10,
            online: 3,
            accounts: 7,
            items: 500,
        }
        .encode(),
        Opcode::OnlineList => OnlineUser::encode_list(&[OnlineUser {
            account: "bob".into(),
            character: "Bob".into(),
            location: Coordinates {
                x: 1496,
                y: 1628,
                z: 10,
            },
            map: "Felucca".into(),
        }]),
        _ => vec![0x0A],
    }
}

// =========================================================================
// Handshake
// =========================================================================

#[tokio::test]
async fn test_challenge_token_comes_from_reply_offset() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let challenge = client.challenge().await.unwrap();

    assert_eq!(server.log().challenges_issued, vec![challenge]);
}

#[tokio::test]
async fn test_authenticated_command_carries_token_and_password() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let outcome = client.broadcast("Hello, Britannia", 5, false).await.unwrap();
    assert!(outcome.is_completed());

    let log = server.log();
    assert_eq!(log.challenges_issued.len(), 1);
    let cmd = &log.commands[0];
    assert_eq!(cmd.opcode, Opcode::Broadcast);
    assert_eq!(cmd.challenge, Some(log.challenges_issued[0]));
    assert_eq!(cmd.password.as_deref(), Some(PASSWORD));
    assert_eq!(
        cmd.args,
        vec![
            Arg::Str("Hello, Britannia".into()),
            Arg::U32(5),
            Arg::Bool(false)
        ]
    );
}

#[tokio::test]
async fn test_keep_alive_skips_the_handshake() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let outcome = client.keep_alive().await.unwrap();

    assert!(outcome.completed().unwrap().is_ack());
    assert!(server.log().challenges_issued.is_empty());
}

#[tokio::test]
async fn test_wrong_password_is_a_rejection_not_an_error() {
    let server = MockServer::start().await;
    let config = ClientConfig {
        password: "wrong".into(),
        ..server.config()
    };
    let client = RconClient::connect(&config).await.unwrap();

    let outcome = client.save(None).await.unwrap();

    assert_eq!(outcome, CommandOutcome::Rejected(Rejection::InvalidPassword));
}

#[tokio::test]
async fn test_concurrent_commands_each_do_their_own_handshake() {
    const N: usize = 12;
    let server = MockServer::start().await;
    let client = server.client().await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..N {
        let client = client.clone();
        tasks.spawn(async move { client.status().await });
    }
    while let Some(result) = tasks.join_next().await {
        let outcome = result.unwrap().unwrap();
        assert!(outcome.is_completed());
    }

    let log = server.log();
    assert_eq!(log.challenges_issued.len(), N);
    assert_eq!(log.challenges_used.len(), N, "every token used exactly once");
    let distinct: HashSet<_> = log.challenges_issued.iter().collect();
    assert_eq!(distinct.len(), N);
}

// =========================================================================
// Catalogue
// =========================================================================

#[tokio::test]
async fn test_status_is_decoded() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let report = client.status().await.unwrap().completed().unwrap();

    assert_eq!(
        report,
        StatusReport {
            shard: "TestShard".into(),
            characters: 10,
            online: 3,
            accounts: 7,
            items: 500,
        }
    );
}

#[tokio::test]
async fn test_online_users_are_decoded() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let users = client.online_users().await.unwrap().completed().unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].account, "bob");
    assert_eq!(users[0].map, "Felucca");
}

#[tokio::test]
async fn test_channel_chat_to_unknown_channel_is_rejected() {
    let server = MockServer::start().await;
    let client = server.client().await;

    let ok = client
        .send_channel_chat("General", "hi", 57, false)
        .await
        .unwrap();
    let rejected = client
        .send_channel_chat("Nowhere", "hi", 57, false)
        .await
        .unwrap();

    assert!(ok.is_completed());
    assert_eq!(rejected, CommandOutcome::Rejected(Rejection::Failed));
}

#[tokio::test]
async fn test_argument_order_for_moderation_commands() {
    let server = MockServer::start().await;
    let client = server.client().await;

    assert!(client.shutdown(true, false).await.unwrap().is_completed());
    assert!(client.verify("BobAccount").await.unwrap().is_completed());
    assert!(client.kick_ban("griefer", true, false).await.unwrap().is_completed());
    assert!(client.unban("griefer").await.unwrap().is_completed());

    let log = server.log();
    let seen: Vec<(Opcode, Vec<Arg>)> = log
        .commands
        .iter()
        .map(|r| (r.opcode, r.args.clone()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (Opcode::Shutdown, vec![Arg::Bool(true), Arg::Bool(false)]),
            (Opcode::Verify, vec![Arg::Str("BobAccount".into())]),
            (
                Opcode::KickBan,
                vec![Arg::Str("griefer".into()), Arg::Bool(true), Arg::Bool(false)]
            ),
            (Opcode::Unban, vec![Arg::Str("griefer".into())]),
        ]
    );
}

#[tokio::test]
async fn test_send_without_reply_still_authenticates() {
    let server = MockServer::start().await;
    let client = server.client().await;
    let command = uorcon_protocol::Command::new(
        Opcode::Broadcast,
        vec!["fire and forget".into(), 1u32.into(), false.into()],
    )
    .unwrap();

    client.send_without_reply(&command).await.unwrap();

    // Give the server a moment to process the one-way datagram.
    for _ in 0..50 {
        if !server.log().commands.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let log = server.log();
    assert_eq!(log.challenges_issued.len(), 1);
    assert_eq!(log.commands.len(), 1);
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn test_silent_server_times_out() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let config = ClientConfig {
        port: silent.local_addr().unwrap().port(),
        timeout_ms: 100,
        ..ClientConfig::default()
    };
    let client = RconClient::connect(&config).await.unwrap();

    let err = client.status().await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[tokio::test]
async fn test_truncated_challenge_reply_is_a_protocol_error() {
    // A server that answers everything with the failure sentinel.
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((_, from)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(&[0xFF], from).await;
        }
    });
    let client = RconClient::connect(&ClientConfig {
        port,
        ..ClientConfig::default()
    })
    .await
    .unwrap();

    let err = client.broadcast("hi", 1, false).await.unwrap_err();

    assert!(matches!(err, ClientError::Protocol(_)), "got {err:?}");
}
