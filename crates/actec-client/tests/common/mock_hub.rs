//! Mock gateway speaking the login and frame protocol

use actec_protocol::{FrameCodec, Message};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use super::test_token;

/// A gateway listening on an ephemeral loopback port
pub struct MockHub {
    listener: TcpListener,
}

impl MockHub {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().unwrap().port()
    }

    /// Accept a raw connection without greeting it
    pub async fn accept_raw(&self) -> TcpStream {
        self.listener.accept().await.unwrap().0
    }

    /// Accept, greet with `login:` and read the credential line
    pub async fn accept(&self) -> HubConnection {
        let mut stream = self.accept_raw().await;
        stream.write_all(b"login:").await.unwrap();
        let credential = read_line(&mut stream).await;
        HubConnection {
            credential,
            framed: Framed::new(stream, FrameCodec::new(test_token())),
        }
    }

    /// Accept, read the credential and hang up
    pub async fn reject(&self) {
        let mut stream = self.accept_raw().await;
        stream.write_all(b"login:").await.unwrap();
        read_line(&mut stream).await;
    }
}

async fn read_line(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    while !line.ends_with(b"\r\n") {
        line.push(stream.read_u8().await.unwrap());
    }
    line.truncate(line.len() - 2);
    String::from_utf8(line).unwrap()
}

/// One logged-in client connection
pub struct HubConnection {
    pub credential: String,
    framed: Framed<TcpStream, FrameCodec>,
}

impl HubConnection {
    pub async fn send(&mut self, message: &Message) {
        self.framed.send(message).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.framed.get_mut().write_all(bytes).await.unwrap();
    }

    /// Next frame from the client, `None` once it hangs up
    pub async fn recv(&mut self) -> Option<Message> {
        match self.framed.next().await {
            Some(Ok(message)) => Some(message),
            _ => None,
        }
    }

    /// Next frame that is not a keepalive
    pub async fn recv_command(&mut self) -> Option<Message> {
        loop {
            let message = self.recv().await?;
            if message.header.namespace != "system" {
                return Some(message);
            }
        }
    }
}
