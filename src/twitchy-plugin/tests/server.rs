mod common;

use common::{FakeApi, Harness};
use serde_json::Value;
use twitchy_core::settings::SettingKey;
use twitchy_plugin::{PluginResponse, PluginResult, PluginServer};

fn responses(out: &[u8]) -> Vec<PluginResponse> {
    String::from_utf8_lossy(out)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response line is JSON"))
        .collect()
}

#[tokio::test]
async fn serves_requests_until_shutdown() {
    let h = Harness::authenticated(FakeApi::default(), &[(SettingKey::ProgramPath, "mpv")]);
    let input = concat!(
        r#"{"id":1,"method":{"type":"Initialize"}}"#,
        "\n",
        r#"{"id":2,"method":{"type":"Query","params":{"query":":mine"}}}"#,
        "\n",
        "\n",
        r#"{"id":3,"method":{"type":"ContextMenu","params":{"context":{"channel_login":"bob","channel_url":"https://www.twitch.tv/bob"}}}}"#,
        "\n",
        r#"{"id":4,"method":{"type":"Shutdown"}}"#,
        "\n",
        r#"{"id":5,"method":{"type":"Initialize"}}"#,
        "\n",
    );
    let mut out = Vec::new();

    PluginServer::new(input.as_bytes(), &mut out, h.plugin)
        .run()
        .await
        .unwrap();

    let responses = responses(&out);
    let ids: Vec<u64> = responses.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    match &responses[0].result {
        PluginResult::Initialized(info) => assert!(info.authenticated),
        other => panic!("expected Initialized, got {other:?}"),
    }
    match &responses[1].result {
        PluginResult::Items { items } => {
            assert_eq!(items.len(), 3);
            assert!(items
                .iter()
                .all(|i| i.title.to_lowercase().contains("mine")));
        }
        other => panic!("expected Items, got {other:?}"),
    }
    match &responses[2].result {
        PluginResult::Items { items } => assert_eq!(items.len(), 2),
        other => panic!("expected Items, got {other:?}"),
    }
    assert!(matches!(responses[3].result, PluginResult::ShutdownAck));
}

#[tokio::test]
async fn unreadable_line_gets_error_with_id_zero() {
    let h = Harness::authenticated(FakeApi::default(), &[]);
    let input = "this is not json\n{\"id\":9,\"method\":{\"type\":\"Shutdown\"}}\n";
    let mut out = Vec::new();

    PluginServer::new(input.as_bytes(), &mut out, h.plugin)
        .run()
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8_lossy(&out)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 0);
    assert_eq!(lines[0]["result"]["status"], "Error");
    assert_eq!(lines[0]["result"]["kind"], "invalid_request");
    assert_eq!(lines[1]["id"], 9);
    assert_eq!(lines[1]["result"]["status"], "ShutdownAck");
}

#[tokio::test]
async fn end_of_input_stops_the_loop() {
    let h = Harness::authenticated(FakeApi::default(), &[]);
    let input = "{\"id\":1,\"method\":{\"type\":\"Query\",\"params\":{\"query\":\"\"}}}\n";
    let mut out = Vec::new();

    let plugin = PluginServer::new(input.as_bytes(), &mut out, h.plugin)
        .run()
        .await
        .unwrap();

    assert_eq!(responses(&out).len(), 1);
    assert!(plugin.session().unwrap().is_ready());
}
