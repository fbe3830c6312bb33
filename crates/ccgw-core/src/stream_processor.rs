use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use bytes::Bytes;
use ccgw_protocol::gemini::GenerateContentResponse;
use ccgw_protocol::openai::OPENAI_STREAM_DONE;
use ccgw_protocol::sse::{DataLineReader, SseFrame, parse_data_line};
use ccgw_transform::FormatterContext;
use ccgw_transform::gemini2claude::GeminiToClaudeStreamState;
use ccgw_transform::gemini2openai::GeminiToOpenAiStreamState;
use ccgw_upstream::UpstreamError;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::GatewayError;

const CHANNEL_CAPACITY: usize = 32;

/// Glues the SSE parser to a per-surface formatter (spec §4.4 "Stream
/// Processor"). One instance per request; `on_end` runs exactly once, after
/// the upstream body ends normally — never on a transport failure, which
/// instead goes through the shared error-frame path in `drain`.
trait StreamRenderer: Send {
    fn on_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<Bytes>;
    fn on_end(&mut self) -> Vec<Bytes>;
}

fn data_frame(value: &serde_json::Value) -> Bytes {
    Bytes::from(SseFrame { event: None, data: value.to_string() }.render())
}

fn event_frame(name: &str, value: &serde_json::Value) -> Bytes {
    Bytes::from(SseFrame { event: Some(name.to_string()), data: value.to_string() }.render())
}

struct NativeRenderer;

impl StreamRenderer for NativeRenderer {
    fn on_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<Bytes> {
        vec![data_frame(&serde_json::to_value(&chunk).unwrap_or(serde_json::Value::Null))]
    }

    fn on_end(&mut self) -> Vec<Bytes> {
        Vec::new()
    }
}

struct OpenAiRenderer(GeminiToOpenAiStreamState);

impl StreamRenderer for OpenAiRenderer {
    fn on_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<Bytes> {
        self.0
            .on_chunk(&chunk)
            .iter()
            .map(|frame| data_frame(&serde_json::to_value(frame).unwrap_or(serde_json::Value::Null)))
            .collect()
    }

    fn on_end(&mut self) -> Vec<Bytes> {
        vec![Bytes::from(format!("data: {OPENAI_STREAM_DONE}\n\n"))]
    }
}

struct ClaudeRenderer(GeminiToClaudeStreamState);

impl StreamRenderer for ClaudeRenderer {
    fn on_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<Bytes> {
        self.0
            .on_chunk(&chunk)
            .iter()
            .map(|event| {
                event_frame(
                    event.event_name(),
                    &serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect()
    }

    fn on_end(&mut self) -> Vec<Bytes> {
        self.0
            .finish_without_reason()
            .iter()
            .map(|event| {
                event_frame(
                    event.event_name(),
                    &serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect()
    }
}

/// Drives `upstream` to completion through `renderer`. A transport/HTTP
/// failure mid-body becomes one inline error frame and the channel is
/// closed without calling `on_end` — no `[DONE]`, no closing Claude events
/// (spec §6 "Streaming errors after headers are sent").
async fn drain(
    mut upstream: BoxStream<'static, Result<Bytes, UpstreamError>>,
    tx: mpsc::Sender<Bytes>,
    mut renderer: Box<dyn StreamRenderer>,
) {
    let mut reader = DataLineReader::new();
    loop {
        match upstream.next().await {
            Some(Ok(chunk)) => {
                for line in reader.push(&chunk) {
                    if let Some(parsed) = parse_data_line(&line) {
                        for frame in renderer.on_chunk(parsed) {
                            if tx.send(frame).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            Some(Err(err)) => {
                let gateway_err = GatewayError::Upstream(err);
                let _ = tx.send(data_frame(&gateway_err.to_stream_frame())).await;
                return;
            }
            None => {
                for frame in renderer.on_end() {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                return;
            }
        }
    }
}

fn sse_response(rx: mpsc::Receiver<Bytes>) -> Response<Body> {
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn spawn(upstream: BoxStream<'static, Result<Bytes, UpstreamError>>, renderer: Box<dyn StreamRenderer>) -> Response<Body> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(drain(upstream, tx, renderer));
    sse_response(rx)
}

pub fn native_stream(upstream: BoxStream<'static, Result<Bytes, UpstreamError>>) -> Response<Body> {
    spawn(upstream, Box::new(NativeRenderer))
}

pub fn openai_stream(
    upstream: BoxStream<'static, Result<Bytes, UpstreamError>>,
    context: FormatterContext,
) -> Response<Body> {
    spawn(upstream, Box::new(OpenAiRenderer(GeminiToOpenAiStreamState::new(context))))
}

pub fn claude_stream(
    upstream: BoxStream<'static, Result<Bytes, UpstreamError>>,
    context: FormatterContext,
) -> Response<Body> {
    spawn(upstream, Box::new(ClaudeRenderer(GeminiToClaudeStreamState::new(context))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccgw_protocol::gemini::{Candidate, Content, ContentRole, FinishReason, Part};

    fn text_chunk(text: &str, finish: Option<FinishReason>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Content { parts: vec![Part::text(text)], role: Some(ContentRole::Model) },
                finish_reason: finish,
                index: Some(0),
            }],
            usage_metadata: None,
            model_version: Some("gemini-2.5-pro".to_string()),
            response_id: Some("resp-1".to_string()),
            create_time: None,
        }
    }

    #[test]
    fn native_renderer_emits_no_terminator() {
        let mut renderer = NativeRenderer;
        let frames = renderer.on_chunk(text_chunk("hi", None));
        assert_eq!(frames.len(), 1);
        assert!(renderer.on_end().is_empty());
    }

    #[test]
    fn openai_renderer_ends_with_done_sentinel() {
        let mut renderer = OpenAiRenderer(GeminiToOpenAiStreamState::new(FormatterContext::new_openai("m")));
        renderer.on_chunk(text_chunk("hi", Some(FinishReason::Stop)));
        let end = renderer.on_end();
        assert_eq!(end.len(), 1);
        assert_eq!(end[0].as_ref(), b"data: [DONE]\n\n");
    }

    #[test]
    fn claude_renderer_closes_an_open_block_on_end() {
        let mut renderer = ClaudeRenderer(GeminiToClaudeStreamState::new(FormatterContext::new_claude("m")));
        renderer.on_chunk(text_chunk("partial", None));
        let end = renderer.on_end();
        let rendered: String = end.iter().map(|frame| String::from_utf8_lossy(frame).to_string()).collect();
        assert!(rendered.contains("event: content_block_stop"));
        assert!(rendered.contains("event: message_stop"));
    }
}
