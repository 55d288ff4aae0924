//! Client network facade: one session to the server.

use log::{debug, info};
use shared::session::POLL_INTERVAL;
use shared::{Message, Session, UNDEFINED_ID};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Wraps the single client-side session and tracks the server-assigned
/// session id ([`UNDEFINED_ID`] until assignment arrives).
pub struct NetClient {
    session: Session,
    session_id: u8,
}

impl NetClient {
    /// Connects to the server and starts the session workers. The session
    /// id arrives later as the server's first message.
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let mut session = Session::new(stream);
        session.start();
        info!("connected to {}", addr);

        Ok(Self {
            session,
            session_id: UNDEFINED_ID,
        })
    }

    pub fn session_id(&self) -> u8 {
        self.session_id
    }

    pub fn set_session_id(&mut self, id: u8) {
        self.session_id = id;
    }

    pub fn send(&self, message: Message) {
        self.session.write(message);
    }

    /// Everything the session received since the last call, in order.
    pub fn receive(&mut self) -> Vec<Message> {
        self.session.drain()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_running()
    }

    /// Stops the session after one poll interval of flush grace, so a
    /// close message written just before has a chance to reach the wire.
    pub async fn stop(&mut self) {
        sleep(POLL_INTERVAL).await;
        self.session.stop().await;
        debug!("session {} stopped", self.session_id);
    }
}
