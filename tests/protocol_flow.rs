//! End-to-end protocol tests: parse, queue, reply.

mod common;

use common::TestServer;

#[tokio::test]
async fn ping_answers_pong_with_echo() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("PING").await?;
    assert_eq!(client.recv_line().await?, "PONG");

    client.send_line("PING are you there").await?;
    assert_eq!(client.recv_line().await?, "PONG are you there");
    Ok(())
}

#[tokio::test]
async fn unknown_command_is_echoed_with_400() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("BOGUS").await?;
    assert_eq!(client.recv_line().await?, "400 ERROR");
    assert_eq!(client.recv_line().await?, "BOGUS");
    Ok(())
}

#[tokio::test]
async fn request_id_prefixes_the_reply() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("REQ 7 CG 1 ADD 0 \"foo\" 1").await?;
    assert_eq!(client.recv_line().await?, "RES 7 202 CG OK");
    Ok(())
}

#[tokio::test]
async fn version_reports_the_package_version() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("VERSION").await?;
    assert_eq!(client.recv_line().await?, "201 VERSION OK");
    assert!(!client.recv_line().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_parameters_answer_402() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("LOADBG 1").await?;
    assert_eq!(client.recv_line().await?, "402 LOADBG ERROR");
    Ok(())
}

#[tokio::test]
async fn out_of_range_channel_answers_401() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("PLAY 9").await?;
    assert_eq!(client.recv_line().await?, "401 PLAY ERROR");
    Ok(())
}

#[tokio::test]
async fn data_store_retrieve_list_remove() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("DATA STORE intro \"hello world\"").await?;
    assert_eq!(client.recv_line().await?, "202 DATA STORE OK");

    client.send_line("DATA RETRIEVE intro").await?;
    assert_eq!(client.recv_line().await?, "201 DATA RETRIEVE OK");
    assert_eq!(client.recv_line().await?, "hello world");

    client.send_line("DATA LIST").await?;
    assert_eq!(client.recv_line().await?, "200 DATA LIST OK");
    assert_eq!(client.recv_line().await?, "intro");
    assert_eq!(client.recv_line().await?, "");

    client.send_line("DATA REMOVE intro").await?;
    assert_eq!(client.recv_line().await?, "202 DATA REMOVE OK");

    client.send_line("DATA RETRIEVE intro").await?;
    assert_eq!(client.recv_line().await?, "404 DATA RETRIEVE FAILED");
    Ok(())
}

#[tokio::test]
async fn batch_commits_as_a_unit() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("REQ 5 BEGIN").await?;
    client.send_line("PLAY 1-10 clip").await?;
    client.send_line("VERSION").await?;
    client.send_line("COMMIT").await?;

    assert_eq!(client.recv_line().await?, "202 PLAY OK");
    assert_eq!(client.recv_line().await?, "201 VERSION OK");
    // Version payload line, then the consolidated batch report.
    client.recv_line().await?;
    assert_eq!(client.recv_line().await?, "RES 5 202 COMMIT OK");
    Ok(())
}

#[tokio::test]
async fn lock_denies_until_the_holder_disconnects() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut holder = server.connect().await?;
    let mut other = server.connect().await?;

    holder.send_line("LOCK 1 ACQUIRE secret").await?;
    assert_eq!(holder.recv_line().await?, "202 LOCK ACQUIRE OK");

    other.send_line("PLAY 1").await?;
    assert_eq!(other.recv_line().await?, "503 PLAY FAILED");

    // Unrelated channels stay accessible.
    other.send_line("PLAY 2").await?;
    assert_eq!(other.recv_line().await?, "202 PLAY OK");

    // Disconnecting the holder releases the lock.
    drop(holder);
    for attempt in 0.. {
        other.send_line("PLAY 1").await?;
        match other.recv_line().await?.as_str() {
            "202 PLAY OK" => break,
            "503 PLAY FAILED" if attempt < 50 => {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
            reply => anyhow::bail!("unexpected reply: {reply}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn lock_clear_needs_the_override_phrase() -> anyhow::Result<()> {
    let server = TestServer::spawn_with(Some("opensesame")).await?;
    let mut holder = server.connect().await?;
    let mut admin = server.connect().await?;

    holder.send_line("LOCK 1 ACQUIRE secret").await?;
    assert_eq!(holder.recv_line().await?, "202 LOCK ACQUIRE OK");

    admin.send_line("LOCK 1 CLEAR").await?;
    assert_eq!(admin.recv_line().await?, "503 LOCK CLEAR FAILED");

    admin.send_line("LOCK 1 CLEAR opensesame").await?;
    assert_eq!(admin.recv_line().await?, "202 LOCK CLEAR OK");

    admin.send_line("PLAY 1").await?;
    assert_eq!(admin.recv_line().await?, "202 PLAY OK");
    Ok(())
}

#[tokio::test]
async fn bye_closes_the_connection() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("BYE").await?;
    assert!(client.is_closed().await);
    Ok(())
}

#[tokio::test]
async fn info_lists_configured_channels() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("INFO").await?;
    assert_eq!(client.recv_line().await?, "200 INFO OK");
    assert_eq!(client.recv_line().await?, "1 PAL PLAYING");
    assert_eq!(client.recv_line().await?, "2 720P50 PLAYING");
    assert_eq!(client.recv_line().await?, "");
    Ok(())
}

#[tokio::test]
async fn log_level_round_trips() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_line("LOG LEVEL").await?;
    assert_eq!(client.recv_line().await?, "201 LOG OK");
    assert_eq!(client.recv_line().await?, "DEBUG");

    client.send_line("LOG LEVEL warn").await?;
    assert_eq!(client.recv_line().await?, "202 LOG OK");

    client.send_line("LOG LEVEL").await?;
    assert_eq!(client.recv_line().await?, "201 LOG OK");
    assert_eq!(client.recv_line().await?, "WARN");
    Ok(())
}
