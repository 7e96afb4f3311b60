use anyhow::Context;
use ntest::timeout;

mod support;

use crate::support::server;

#[test]
#[timeout(30000)]
fn call_round_trip() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp = server::post(
        &proc,
        "/mcp",
        r##"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_color_info","arguments":{"hexCode":"#123456"}}}"##,
    )?;
    assert_eq!(resp.status, 200);

    let frame: serde_json::Value =
        serde_json::from_str(&resp.body).context("parsing response frame")?;
    assert_eq!(frame["id"], 1);
    assert_eq!(frame["result"]["isError"], false);
    let text = frame["result"]["content"][0]["text"].as_str().context("text content")?;
    let info: serde_json::Value = serde_json::from_str(text).context("parsing payload")?;
    assert_eq!(info["name"], "midnightblue");
    assert_eq!(info["rgb"], "rgb(18, 52, 86)");

    Ok(())
}

#[test]
#[timeout(30000)]
fn initialize_then_list() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp = server::post(
        &proc,
        "/mcp",
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
    )?;
    assert_eq!(resp.status, 200);
    let frame: serde_json::Value =
        serde_json::from_str(&resp.body).context("parsing response frame")?;
    assert_eq!(frame["result"]["protocolVersion"], "2024-11-05");

    let resp = server::post(&proc, "/mcp", r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)?;
    assert_eq!(resp.status, 200);
    let frame: serde_json::Value =
        serde_json::from_str(&resp.body).context("parsing response frame")?;
    assert_eq!(frame["result"]["tools"][0]["name"], "get_color_info");

    Ok(())
}

#[test]
#[timeout(30000)]
fn notification_gets_accepted() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp =
        server::post(&proc, "/mcp", r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)?;
    assert_eq!(resp.status, 202);
    assert_eq!(resp.body.len(), 0);

    Ok(())
}

#[test]
#[timeout(30000)]
fn rejects_non_post() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp = server::send_raw(&proc, "GET /mcp HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
    assert_eq!(resp.status, 405);

    Ok(())
}

#[test]
#[timeout(30000)]
fn rejects_unknown_path() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp = server::post(&proc, "/palette", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)?;
    assert_eq!(resp.status, 404);

    Ok(())
}

#[test]
#[timeout(30000)]
fn garbage_body_is_parse_error() -> anyhow::Result<()> {
    let proc = server::Proc::new("serve-http").context("starting http server")?;

    let resp = server::post(&proc, "/mcp", "{this is not json")?;
    assert_eq!(resp.status, 200);
    let frame: serde_json::Value =
        serde_json::from_str(&resp.body).context("parsing response frame")?;
    assert_eq!(frame["error"]["code"], -32700);
    assert!(frame["id"].is_null());

    Ok(())
}
