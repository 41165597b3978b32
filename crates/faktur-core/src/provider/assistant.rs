//! Assistant-thread provider.
//!
//! Drives a hosted assistant through the full session: upload the file,
//! create an assistant and a thread, attach the file to a message, run the
//! thread and read the reply back as a field tree. Every created resource
//! is deleted again at the end, whether extraction succeeded or not.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ExtractionProvider, ProcessingStatus, Result};
use crate::error::ProviderError;
use crate::models::config::AssistantConfig;
use crate::models::record::{DocumentInput, FieldTree};
use crate::orchestrate::retry::Backoff;

const ASSISTANTS_BETA: &str = "assistants=v2";
const RUN_POLL_ATTEMPTS: u32 = 10;
const MESSAGE_POLL_ATTEMPTS: u32 = 10;
const POLL_BACKOFF: Backoff = Backoff::Exponential {
    base: Duration::from_secs(1),
};

/// Response shape the assistant is instructed to produce.
const SCHEMA: &str = include_str!("schema.json");

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
}

fn file_search() -> Tool {
    Tool { kind: "file_search" }
}

#[derive(Debug, Serialize)]
struct CreateAssistantRequest {
    model: String,
    instructions: String,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    role: &'static str,
    content: &'static str,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    file_id: String,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest {
    assistant_id: String,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunState {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

/// Resources created during one extraction, torn down by [`AssistantProvider::cleanup`].
#[derive(Default)]
struct Session {
    file_id: Option<String>,
    assistant_id: Option<String>,
    thread_id: Option<String>,
}

pub struct AssistantProvider {
    client: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantProvider {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn instructions(&self) -> String {
        format!(
            "You analyze the invoice documents attached to the thread. Always respond \
             with ONLY a valid JSON object, without markdown code blocks, matching this \
             schema: {SCHEMA} Remove quotation marks in names. If information is missing \
             from the document, leave the string empty."
        )
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let resp = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .json(body)
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}{}", self.config.base_url, path))
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .send()
            .await?;
        Self::parse(resp).await
    }

    async fn upload_file(&self, document: &DocumentInput) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.filename.clone())
            .mime_str(document.content_type())
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/files", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::UploadFailed(format!(
                "status {status}: {message}"
            )));
        }

        let parsed: ObjectId = resp
            .json()
            .await
            .map_err(|err| ProviderError::UploadFailed(err.to_string()))?;
        Ok(parsed.id)
    }

    async fn create_assistant(&self) -> Result<String> {
        let request = CreateAssistantRequest {
            model: self.config.model.clone(),
            instructions: self.instructions(),
            tools: vec![file_search()],
        };
        let created: ObjectId = self.post_json("/assistants", &request).await?;
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String> {
        let created: ObjectId = self.post_json("/threads", &serde_json::json!({})).await?;
        Ok(created.id)
    }

    async fn post_message(&self, thread_id: &str, file_id: &str) -> Result<()> {
        let request = MessageRequest {
            role: "user",
            content: "Please analyze the attached file.",
            attachments: vec![Attachment {
                file_id: file_id.to_string(),
                tools: vec![file_search()],
            }],
        };
        let _: ObjectId = self
            .post_json(&format!("/threads/{thread_id}/messages"), &request)
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<String> {
        let request = CreateRunRequest {
            assistant_id: assistant_id.to_string(),
        };
        let created: ObjectId = self
            .post_json(&format!("/threads/{thread_id}/runs"), &request)
            .await?;
        Ok(created.id)
    }

    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        for attempt in 1..=RUN_POLL_ATTEMPTS {
            let state: RunState = self
                .get_json(&format!("/threads/{thread_id}/runs/{run_id}"))
                .await?;
            match ProcessingStatus::from_run_status(&state.status) {
                ProcessingStatus::Done => return Ok(()),
                ProcessingStatus::Failed => {
                    return Err(ProviderError::ProcessingFailed(format!(
                        "assistant run ended as {}",
                        state.status
                    )));
                }
                _ => {
                    debug!(run_id, status = %state.status, attempt, "Run still going");
                    tokio::time::sleep(POLL_BACKOFF.delay(attempt)).await;
                }
            }
        }
        Err(ProviderError::PollingExhausted {
            attempts: RUN_POLL_ATTEMPTS,
        })
    }

    /// The reply is considered complete once the thread holds at least the
    /// prompt and one assistant message with non-empty content.
    async fn wait_for_answer(&self, thread_id: &str) -> Result<String> {
        for attempt in 1..=MESSAGE_POLL_ATTEMPTS {
            let list: MessageList = self
                .get_json(&format!("/threads/{thread_id}/messages"))
                .await?;
            if let Some(answer) = extract_answer(&list) {
                return Ok(answer);
            }
            debug!(thread_id, attempt, "Assistant reply not complete yet");
            tokio::time::sleep(POLL_BACKOFF.delay(attempt)).await;
        }
        Err(ProviderError::PollingExhausted {
            attempts: MESSAGE_POLL_ATTEMPTS,
        })
    }

    async fn delete_resource(&self, kind: &str, id: &str) {
        let url = format!("{}/{kind}/{id}", self.config.base_url);
        let result = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", ASSISTANTS_BETA)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!(kind, id, "Deleted assistant resource");
            }
            Ok(resp) => {
                warn!(kind, id, status = %resp.status(), "Could not delete assistant resource");
            }
            Err(err) => {
                warn!(kind, id, error = %err, "Could not delete assistant resource");
            }
        }
    }

    async fn run_session(&self, document: &DocumentInput, session: &mut Session) -> Result<String> {
        let file_id = self.upload_file(document).await?;
        session.file_id = Some(file_id.clone());
        info!(file_id = %file_id, "File uploaded to assistant store");

        let assistant_id = self.create_assistant().await?;
        session.assistant_id = Some(assistant_id.clone());

        let thread_id = self.create_thread().await?;
        session.thread_id = Some(thread_id.clone());

        self.post_message(&thread_id, &file_id).await?;
        let run_id = self.create_run(&thread_id, &assistant_id).await?;
        debug!(thread_id = %thread_id, run_id = %run_id, "Run started");
        self.wait_for_run(&thread_id, &run_id).await?;
        self.wait_for_answer(&thread_id).await
    }

    async fn cleanup(&self, session: &Session) {
        if let Some(id) = &session.file_id {
            self.delete_resource("files", id).await;
        }
        if let Some(id) = &session.thread_id {
            self.delete_resource("threads", id).await;
        }
        if let Some(id) = &session.assistant_id {
            self.delete_resource("assistants", id).await;
        }
    }
}

/// Pulls the text of the first assistant message out of a thread listing.
/// Returns `None` while the thread does not yet hold a usable reply.
fn extract_answer(list: &MessageList) -> Option<String> {
    if list.data.len() < 2 {
        return None;
    }
    let newest = list.data.first()?;
    if newest.content.is_empty() {
        return None;
    }
    list.data
        .iter()
        .find(|message| message.role == "assistant")
        .and_then(|message| message.content.first())
        .and_then(|content| content.text.as_ref())
        .map(|text| text.value.clone())
}

#[async_trait::async_trait]
impl ExtractionProvider for AssistantProvider {
    fn name(&self) -> &'static str {
        "assistant"
    }

    async fn extract(&self, document: &DocumentInput) -> Result<FieldTree> {
        info!(filename = %document.filename, "Starting assistant session");
        let mut session = Session::default();
        let outcome = self.run_session(document, &mut session).await;
        self.cleanup(&session).await;
        let answer = outcome?;
        FieldTree::from_json(&answer)
            .map_err(|err| ProviderError::ResultUnparsable(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn message(role: &str, text: Option<&str>) -> ThreadMessage {
        ThreadMessage {
            role: role.to_string(),
            content: text
                .map(|value| {
                    vec![MessageContent {
                        text: Some(MessageText {
                            value: value.to_string(),
                        }),
                    }]
                })
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_answer_needs_at_least_two_messages() {
        let list = MessageList {
            data: vec![message("user", Some("Please analyze the attached file."))],
        };
        assert_eq!(extract_answer(&list), None);
    }

    #[test]
    fn test_answer_rejects_empty_newest_content() {
        let list = MessageList {
            data: vec![
                message("assistant", None),
                message("user", Some("Please analyze the attached file.")),
            ],
        };
        assert_eq!(extract_answer(&list), None);
    }

    #[test]
    fn test_answer_takes_first_assistant_message() {
        let list = MessageList {
            data: vec![
                message("assistant", Some("{\"data\":{}}")),
                message("user", Some("Please analyze the attached file.")),
            ],
        };
        assert_eq!(extract_answer(&list), Some("{\"data\":{}}".to_string()));
    }

    #[test]
    fn test_message_list_deserializes_api_payload() {
        let list: MessageList = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {
                    "id": "msg_2",
                    "role": "assistant",
                    "content": [
                        { "type": "text", "text": { "value": "{}", "annotations": [] } }
                    ]
                },
                {
                    "id": "msg_1",
                    "role": "user",
                    "content": [
                        { "type": "text", "text": { "value": "Please analyze the attached file." } }
                    ]
                }
            ]
        }))
        .unwrap();
        assert_eq!(extract_answer(&list), Some("{}".to_string()));
    }

    #[test]
    fn test_message_request_wire_shape() {
        let request = MessageRequest {
            role: "user",
            content: "Please analyze the attached file.",
            attachments: vec![Attachment {
                file_id: "file-1".to_string(),
                tools: vec![file_search()],
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "role": "user",
                "content": "Please analyze the attached file.",
                "attachments": [
                    { "file_id": "file-1", "tools": [ { "type": "file_search" } ] }
                ]
            })
        );
    }

    #[test]
    fn test_instructions_embed_schema_and_rules() {
        let provider = AssistantProvider::new(AssistantConfig::default());
        let instructions = provider.instructions();
        assert!(instructions.contains("ONLY a valid JSON object"));
        assert!(instructions.contains("\"invn\""));
        assert!(instructions.contains("leave the string empty"));
    }
}
