use std::collections::HashMap;

use reqwest::Method;
use uuid::Uuid;

use crate::{
    client::segment,
    codec::{self, decode_existence, decode_json, encode_json},
    validate, Event, EventResult, JsonCodec, Result, SmartObjectsClient, SmartObjectsError,
};

/// Event ingestion: `events/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct EventsClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> EventsClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    /// Sends up to 1000 events and returns one result per event.
    pub async fn send(&self, events: &[Event]) -> Result<Vec<EventResult>> {
        validate_events(events, DeviceCheck::Required)?;

        let body = Event::list_to_json(events)?;
        let response = self
            .client
            .send_request(Method::POST, "events?report_results=true", Some(&body))
            .await?;
        decode_event_results(&response)
    }

    /// Sends up to 1000 events on behalf of the object `device_id`.
    pub async fn send_to_object(
        &self,
        device_id: &str,
        events: &[Event],
    ) -> Result<Vec<EventResult>> {
        validate::not_blank(device_id, "deviceId cannot be blank.")?;
        validate_events(events, DeviceCheck::FromPath)?;

        let body = object_events_json(events)?;
        let response = self
            .client
            .send_request(
                Method::POST,
                &format!("objects/{}/events?report_results=true", segment(device_id)),
                Some(&body),
            )
            .await?;
        decode_event_results(&response)
    }

    pub async fn exists(&self, event_id: Uuid) -> Result<bool> {
        if event_id.is_nil() {
            return Err(SmartObjectsError::validation("eventId cannot be blank."));
        }

        let id = event_id.to_string();
        let response = self
            .client
            .send_request(Method::GET, &format!("events/exists/{id}"), None)
            .await?;
        decode_existence(&response)?
            .into_iter()
            .find(|(key, _)| Uuid::parse_str(key).is_ok_and(|key| key == event_id))
            .map(|(_, exists)| exists)
            .ok_or_else(|| {
                SmartObjectsError::Decode(format!(
                    "existence reply does not mention '{id}': {response}"
                ))
            })
    }

    /// Checks up to 1000 event ids in one call.
    pub async fn exist(&self, event_ids: &[Uuid]) -> Result<HashMap<Uuid, bool>> {
        validate::batch_size(
            event_ids,
            "List of eventIds cannot be empty or biger that 1000.",
        )?;

        let body = encode_json(event_ids)?;
        let response = self
            .client
            .send_request(Method::POST, "events/exists", Some(&body))
            .await?;
        decode_existence(&response)?
            .into_iter()
            .map(|(key, exists)| {
                Uuid::parse_str(&key)
                    .map(|id| (id, exists))
                    .map_err(|_| SmartObjectsError::type_mismatch(key, "GUID"))
            })
            .collect()
    }
}

/// Whether each event must name its device, or the URL already does.
#[derive(Clone, Copy, PartialEq, Eq)]
enum DeviceCheck {
    Required,
    FromPath,
}

fn validate_events(events: &[Event], device: DeviceCheck) -> Result<()> {
    validate::batch_size(events, "Event body list cannot be empty or biger that 1000.")?;
    for event in events {
        validate::not_blank(event.event_type(), "x_event_type cannot be blank.")?;
        if device == DeviceCheck::Required {
            validate::not_blank(event.device_id(), "x_device_id cannot be blank.")?;
        }
    }
    Ok(())
}

/// Events posted under `objects/{deviceId}/events`; a blank device is left
/// out of the body rather than sent as an empty `x_object`.
fn object_events_json(events: &[Event]) -> Result<String> {
    let values = events
        .iter()
        .map(|event| {
            let mut map = event.to_map()?;
            if event.device_id().trim().is_empty() {
                map.remove(codec::OBJECT);
            }
            Ok(serde_json::Value::Object(map))
        })
        .collect::<Result<Vec<_>>>()?;
    encode_json(&values)
}

fn decode_event_results(response: &str) -> Result<Vec<EventResult>> {
    if response.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_json(response)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{decode_event_results, object_events_json, validate_events, DeviceCheck};
    use crate::{Event, ResultState, SmartObjectsError};

    #[test]
    fn empty_reply_means_no_results() {
        assert!(decode_event_results("").expect("must decode").is_empty());
    }

    #[test]
    fn event_results_decode() {
        let id = Uuid::new_v4();
        let results = decode_event_results(&format!(
            r#"[{{"id":"{id}","result":"error","message":"unknown type","objectExists":false}}]"#
        ))
        .expect("must decode");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].result, ResultState::Error);
        assert_eq!(results[0].object_exists, Some(false));
    }

    #[test]
    fn blank_event_type_is_rejected() {
        let events = [Event::builder(" ", "dev-1").build()];
        let err = validate_events(&events, DeviceCheck::Required).expect_err("must fail");
        match err {
            SmartObjectsError::Validation(message) => {
                assert_eq!(message, "x_event_type cannot be blank.")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn object_path_events_need_no_device() {
        let events = [Event::builder("temperature", "").build()];

        let err = validate_events(&events, DeviceCheck::Required).expect_err("must fail");
        assert_eq!(err.to_string(), "x_device_id cannot be blank.");
        validate_events(&events, DeviceCheck::FromPath).expect("device comes from the path");

        let body: serde_json::Value =
            serde_json::from_str(&object_events_json(&events).expect("must encode"))
                .expect("must be JSON");
        assert_eq!(body, serde_json::json!([{"x_event_type": "temperature"}]));
    }
}
