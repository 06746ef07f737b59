//! Bridge-side client for the harukid socket

use haruki_api::{
    Caller, Command, Event, Invocation, Reply, Request, Response, ResponsePayload, ResponseResult,
    ViewRef,
};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::{IpcError, IpcResult};

type FrameReader = Lines<BufReader<OwnedReadHalf>>;

/// Next non-blank NDJSON frame
async fn read_frame<T: DeserializeOwned>(frames: &mut FrameReader) -> IpcResult<T> {
    loop {
        let line = frames.next_line().await?.ok_or(IpcError::ConnectionClosed)?;
        if !line.trim().is_empty() {
            return Ok(serde_json::from_str(&line)?);
        }
    }
}

/// One bridge connection. Requests are answered strictly in order.
pub struct IpcClient {
    frames: FrameReader,
    writer: OwnedWriteHalf,
    last_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let (read_half, writer) = UnixStream::connect(socket_path).await?.into_split();
        Ok(Self {
            frames: BufReader::new(read_half).lines(),
            writer,
            last_request_id: 0,
        })
    }

    /// Send a command and wait for its response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        self.last_request_id += 1;
        let request_id = self.last_request_id;

        let mut frame = serde_json::to_vec(&Request::new(request_id, command))?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;

        let response: Response = read_frame(&mut self.frames).await?;
        if response.request_id != request_id {
            return Err(IpcError::InvalidMessage(format!(
                "response for request {} while waiting for {}",
                response.request_id, request_id
            )));
        }
        Ok(response)
    }

    /// Start a wizard
    pub async fn invoke(&mut self, caller: Caller, target: ViewRef, invocation: Invocation) -> IpcResult<Reply> {
        let command = Command::Invoke {
            caller,
            target,
            invocation,
        };
        into_reply(self.send(command).await?)
    }

    /// Report a control event
    pub async fn component(
        &mut self,
        caller: Caller,
        target: ViewRef,
        component_id: impl Into<String>,
        values: Vec<String>,
    ) -> IpcResult<Reply> {
        let command = Command::Component {
            caller,
            target,
            component_id: component_id.into(),
            values,
        };
        into_reply(self.send(command).await?)
    }

    /// Switch this connection to event streaming
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        match self.send(Command::SubscribeEvents).await?.result {
            ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
            ResponseResult::Ok(_) => Ok(EventStream { frames: self.frames }),
        }
    }
}

fn into_reply(response: Response) -> IpcResult<Reply> {
    match response.result {
        ResponseResult::Ok(ResponsePayload::Reply(reply)) => Ok(reply),
        ResponseResult::Ok(other) => Err(IpcError::InvalidMessage(format!(
            "expected a reply, got {:?}",
            other
        ))),
        ResponseResult::Err(e) => Err(IpcError::ServerError(e.message)),
    }
}

/// Events pushed by harukid after a subscribe
pub struct EventStream {
    frames: FrameReader,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        read_frame(&mut self.frames).await
    }
}
