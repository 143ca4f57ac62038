use std::time::{SystemTime, UNIX_EPOCH};

use smartobjects_http::{Event, Owner, SmartObject, SmartObjectsClient};

fn live_client() -> Option<SmartObjectsClient> {
    let has_credentials = std::env::var("SMARTOBJECTS_TOKEN").is_ok()
        || (std::env::var("SMARTOBJECTS_CONSUMER_KEY").is_ok()
            && std::env::var("SMARTOBJECTS_CONSUMER_SECRET").is_ok());
    if !has_credentials {
        return None;
    }
    Some(SmartObjectsClient::from_env().expect("live config must be valid"))
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_millis()
}

#[tokio::test]
async fn live_owner_object_and_event_roundtrip() -> anyhow::Result<()> {
    let Some(client) = live_client() else {
        eprintln!("skipping live test: SMARTOBJECTS_* credentials not set");
        return Ok(());
    };

    let suffix = unique_suffix();
    let username = format!("live-owner-{suffix}");
    let device_id = format!("live-device-{suffix}");

    client
        .owners()
        .create(&Owner::builder(&username).password("live-password").build())
        .await
        .expect("owner creation must succeed");
    client
        .objects()
        .create(
            &SmartObject::builder(&device_id)
                .object_type("live_test")
                .build(),
        )
        .await
        .expect("object creation must succeed");
    client
        .owners()
        .claim(&username, &device_id)
        .await
        .expect("claim must succeed");

    let results = client
        .events()
        .send_to_object(&device_id, &[Event::builder("live_event", &device_id).build()])
        .await
        .expect("event ingestion must succeed");
    assert_eq!(results.len(), 1);

    assert!(client
        .owners()
        .exists(&username)
        .await
        .expect("owner existence check must succeed"));
    assert!(client
        .objects()
        .exists(&device_id)
        .await
        .expect("object existence check must succeed"));

    client
        .owners()
        .unclaim(&username, &device_id)
        .await
        .expect("unclaim must succeed");
    client
        .objects()
        .delete(&device_id)
        .await
        .expect("object cleanup must succeed");
    client
        .owners()
        .delete(&username)
        .await?;
    Ok(())
}
