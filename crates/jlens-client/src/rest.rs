//! HTTP implementation of the panel service.
//!
//! Maps the backend endpoints onto `PanelService`: JSON CRUD through the
//! transport reply helpers, streaming analysis through the incremental
//! event-stream parser. A 401 anywhere maps to `PanelError::Unauthorized`
//! so the app can redirect to the login flow. Malformed JSON payloads on
//! the stream's `result`/`error` channels fail soft: the raw payload text
//! becomes the visible message.

use async_trait::async_trait;
use reqwest::Method;

use crate::error::PanelError;
use crate::fanout::{FanOutLog, InstanceReply, StreamChannel};
use crate::http::{try_json, JsonReply, Transport};
use crate::service::PanelService;
use crate::sse::{EventStreamParser, SseRecord};
use crate::types::{
    AnalyzeRequest, Instance, MaskKind, NewProject, ProjectsReply, SearchReply, UiState,
};

/// Panel service talking to the real backend.
#[derive(Debug)]
pub struct HttpPanelService {
    transport: Transport,
}

impl HttpPanelService {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PanelError> {
        let reply = self.transport.fetch_json(Method::GET, path, query, None).await;
        decode_reply(reply)
    }
}

#[async_trait]
impl PanelService for HttpPanelService {
    async fn ui_state(&self) -> Result<UiState, PanelError> {
        self.get_json("/ui/state", &[]).await
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, PanelError> {
        #[derive(serde::Deserialize, Default)]
        struct InstancesReply {
            #[serde(default)]
            jira_sites: Vec<Instance>,
        }
        let reply: InstancesReply = self.get_json("/jira/instances", &[]).await?;
        Ok(reply.jira_sites)
    }

    async fn list_projects(&self) -> Result<ProjectsReply, PanelError> {
        self.get_json("/po/projects", &[]).await
    }

    async fn refresh_projects(&self) -> Result<ProjectsReply, PanelError> {
        let body = serde_json::json!({ "reset_definitive": false });
        let reply = self
            .transport
            .fetch_json(Method::POST, "/po/projects/refresh", &[], Some(&body))
            .await;
        decode_reply(reply)
    }

    async fn add_project(&self, project: NewProject) -> Result<(), PanelError> {
        let body = serde_json::to_value(&project)
            .map_err(|err| PanelError::InvalidArgument(err.to_string()))?;
        let reply = self
            .transport
            .fetch_json(Method::POST, "/po/projects", &[], Some(&body))
            .await;
        check_reply(&reply)
    }

    async fn mask_project(
        &self,
        project_key: &str,
        cloud_id: Option<&str>,
        mask: MaskKind,
    ) -> Result<(), PanelError> {
        let path = format!("/po/projects/{project_key}");
        let query: Vec<(&str, &str)> = match cloud_id {
            Some(id) => vec![("cloud_id", id)],
            None => Vec::new(),
        };
        let body = serde_json::json!({
            "mask_type": mask.as_str(),
            "cloud_id": cloud_id,
        });
        let reply = self
            .transport
            .fetch_json(Method::DELETE, &path, &query, Some(&body))
            .await;
        check_reply(&reply)
    }

    async fn analyze_issue(
        &self,
        instance: &Instance,
        request: &AnalyzeRequest,
        log: &mut FanOutLog<'_>,
    ) -> InstanceReply {
        let (max_links, max_comments) = request.mode.limits();
        let body = serde_json::json!({
            "issue_key": request.issue_key,
            "cloud_id": instance.id,
            "max_links": max_links,
            "max_comments": max_comments,
        });

        let mut response = match self
            .transport
            .send_raw(Method::POST, "/ai/analyze-issue/stream", &[], Some(&body))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return InstanceReply::Failure {
                    code: None,
                    message: err.to_string(),
                }
            }
        };

        if !response.status().is_success() {
            let code = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return InstanceReply::Failure {
                code: Some(code),
                message: text,
            };
        }

        let mut parser = EventStreamParser::new();
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    return InstanceReply::Failure {
                        code: None,
                        message: err.to_string(),
                    }
                }
            };
            for record in parser.push(&String::from_utf8_lossy(&chunk)) {
                match decode_stream_record(&record) {
                    Some(StreamChannel::Log(line)) => log.push(line),
                    Some(StreamChannel::Result(text)) => return InstanceReply::Result(text),
                    Some(StreamChannel::Error { code, message }) => {
                        return InstanceReply::Failure { code, message }
                    }
                    None => {}
                }
            }
        }

        InstanceReply::Failure {
            code: None,
            message: "stream closed without a result".to_string(),
        }
    }

    async fn search_jql(&self, instance: &Instance, jql: &str) -> Result<SearchReply, PanelError> {
        self.get_json(
            "/jira/search",
            &[("jql", jql), ("cloud_id", instance.id.as_str())],
        )
        .await
    }

    async fn summarize_jql(
        &self,
        instance: &Instance,
        jql: &str,
        max_results: u32,
    ) -> Result<String, PanelError> {
        let body = serde_json::json!({
            "jql": jql,
            "cloud_id": instance.id,
            "max_results": max_results,
        });
        let reply = self
            .transport
            .fetch_text(Method::POST, "/ai/summarize-jql", &[], Some(&body))
            .await;
        if reply.status == 401 {
            return Err(PanelError::Unauthorized);
        }
        if reply.status == 0 {
            return Err(PanelError::Transport(reply.text));
        }
        if !reply.ok {
            return Err(PanelError::BadReply {
                status: reply.status,
                body: reply.text,
            });
        }
        Ok(reply.text)
    }
}

/// Maps a JSON reply onto the error taxonomy, then deserializes the body.
fn decode_reply<T: serde::de::DeserializeOwned>(reply: JsonReply) -> Result<T, PanelError> {
    check_reply(&reply)?;
    let Some(json) = reply.json else {
        return Err(PanelError::BadReply {
            status: reply.status,
            body: reply.text,
        });
    };
    serde_json::from_value(json).map_err(|_| PanelError::BadReply {
        status: reply.status,
        body: reply.text,
    })
}

fn check_reply(reply: &JsonReply) -> Result<(), PanelError> {
    if reply.status == 401 {
        return Err(PanelError::Unauthorized);
    }
    if reply.status == 0 {
        return Err(PanelError::Transport(reply.text.clone()));
    }
    if !reply.ok {
        return Err(PanelError::BadReply {
            status: reply.status,
            body: reply.text.clone(),
        });
    }
    Ok(())
}

/// Maps one parsed stream record onto its semantic channel. Unknown event
/// names are ignored.
fn decode_stream_record(record: &SseRecord) -> Option<StreamChannel> {
    match record.event.as_str() {
        "log" => Some(StreamChannel::Log(record.data.clone())),
        "result" => Some(StreamChannel::Result(decode_result_payload(&record.data))),
        "error" => {
            let (code, message) = decode_error_payload(&record.data);
            Some(StreamChannel::Error { code, message })
        }
        _ => None,
    }
}

/// `{"text": ...}` payload; anything else falls back to the raw text.
fn decode_result_payload(data: &str) -> String {
    try_json(data)
        .and_then(|payload| {
            payload
                .get("text")
                .and_then(|text| text.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| data.to_string())
}

/// `{"code": ..., "message": ...}` payload; malformed payloads fall back
/// to the raw text with no code.
fn decode_error_payload(data: &str) -> (Option<u16>, String) {
    let Some(payload) = try_json(data) else {
        return (None, data.to_string());
    };
    let code = payload
        .get("code")
        .and_then(|code| code.as_u64())
        .and_then(|code| u16::try_from(code).ok());
    let message = payload
        .get("message")
        .and_then(|message| message.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string());
    (code, message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{check_reply, decode_error_payload, decode_result_payload, decode_stream_record};
    use crate::error::PanelError;
    use crate::fanout::StreamChannel;
    use crate::http::JsonReply;
    use crate::sse::SseRecord;

    fn reply(ok: bool, status: u16, text: &str) -> JsonReply {
        JsonReply {
            ok,
            status,
            text: text.to_string(),
            json: crate::http::try_json(text),
        }
    }

    #[test]
    fn check_reply_maps_status_codes() {
        assert_eq!(
            check_reply(&reply(false, 401, "")),
            Err(PanelError::Unauthorized)
        );
        assert_eq!(
            check_reply(&reply(false, 0, "connection refused")),
            Err(PanelError::Transport("connection refused".to_string()))
        );
        assert_eq!(
            check_reply(&reply(false, 503, "down")),
            Err(PanelError::BadReply {
                status: 503,
                body: "down".to_string()
            })
        );
        assert!(check_reply(&reply(true, 200, "{}")).is_ok());
    }

    #[test]
    fn result_payload_fails_soft_on_malformed_json() {
        assert_eq!(decode_result_payload(r#"{"text":"analysis"}"#), "analysis");
        assert_eq!(decode_result_payload("not json at all"), "not json at all");
        // JSON without the expected field keeps the raw text too.
        assert_eq!(decode_result_payload(r#"{"other":1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn error_payload_fails_soft_on_malformed_json() {
        assert_eq!(
            decode_error_payload(r#"{"code":404,"message":"issue not found"}"#),
            (Some(404), "issue not found".to_string())
        );
        assert_eq!(
            decode_error_payload("plain failure"),
            (None, "plain failure".to_string())
        );
        assert_eq!(
            decode_error_payload(r#"{"code":"weird"}"#),
            (None, r#"{"code":"weird"}"#.to_string())
        );
    }

    #[test]
    fn stream_records_map_to_channels() {
        let rec = |event: &str, data: &str| SseRecord {
            event: event.to_string(),
            data: data.to_string(),
        };
        assert_eq!(
            decode_stream_record(&rec("log", "working")),
            Some(StreamChannel::Log("working".to_string()))
        );
        assert_eq!(
            decode_stream_record(&rec("result", r#"{"text":"ok"}"#)),
            Some(StreamChannel::Result("ok".to_string()))
        );
        assert!(matches!(
            decode_stream_record(&rec("error", r#"{"code":500,"message":"boom"}"#)),
            Some(StreamChannel::Error {
                code: Some(500),
                ..
            })
        ));
        assert_eq!(decode_stream_record(&rec("message", "ignored")), None);
    }
}
