//! Gateway setup and pairing
//!
//! Setup failures are sorted into [`SetupError`] variants so the caller can
//! tell "try again later" apart from "wrong device", "approve in the app"
//! and "unreadable data".

use actec_client::{ClientConfig, Session};
use actec_protocol::{commands, AreaNameRule};
use tracing::{debug, info, warn};

use crate::error::{GatewayError, SetupError};
use crate::gateway::Gateway;

impl Gateway {
    /// Connect, load the topology and confirm the connection held
    ///
    /// On success the gateway is ready for [`Gateway::run`] and
    /// [`Gateway::run_ping_loop`].
    pub async fn bootstrap(&self, rule: AreaNameRule) -> Result<(), SetupError> {
        self.connect().await.map_err(|err| match err {
            GatewayError::Client(err) => SetupError::from_connect(err),
            other => SetupError::NotSupported(other.to_string()),
        })?;

        let report = match self.get_report().await {
            Ok(report) => report,
            Err(err) => {
                self.close().await;
                return Err(SetupError::NotSupported(err.to_string()));
            }
        };
        if !report.success {
            warn!(mac = %self.mac(), "gateway has not authorized this client yet");
            self.close().await;
            return Err(SetupError::AuthorizationPending);
        }

        let floors = match report.floors() {
            Ok(floors) => floors,
            Err(err) => {
                self.close().await;
                return Err(SetupError::DataFormat(err.to_string()));
            }
        };
        if let Err(err) = self.init_devices(&floors, rule) {
            self.close().await;
            return Err(SetupError::DataFormat(err.to_string()));
        }

        self.ensure_alive()
            .await
            .map_err(|err| SetupError::NotReady(err.to_string()))?;
        info!(mac = %self.mac(), "gateway ready");
        Ok(())
    }
}

/// Check that a gateway accepts `config` and has authorized it
///
/// Opens a throw-away session, asks for the report and closes again.
pub async fn probe(config: ClientConfig) -> Result<(), SetupError> {
    let session = Session::new(config);
    let result = probe_session(&session).await;
    session.close(false).await;
    result
}

async fn probe_session(session: &Session) -> Result<(), SetupError> {
    session.connect().await.map_err(SetupError::from_connect)?;
    let reply = session
        .request(&commands::report_request())
        .await
        .map_err(|err| SetupError::NotSupported(err.to_string()))?;

    debug!(reply = %reply, "probe reply");
    if reply.header.success.unwrap_or(false) {
        Ok(())
    } else {
        Err(SetupError::AuthorizationPending)
    }
}
