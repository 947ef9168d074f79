use std::fs;
use std::time::Duration;

use rumqttc::{Client, Connection, MqttOptions, QoS, TlsConfiguration, Transport};
use tracing::{info, trace};

use crate::config::MqttConfig;
use crate::error::{Error, Result};

const CLIENT_ID: &str = "sdm72-mon";
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const PUMP_TIMEOUT: Duration = Duration::from_millis(1);

/// Synchronous broker client. The connection event loop is not serviced
/// by a background task; the poll loop drains it via [`MqttPublisher::pump`]
/// once per iteration.
pub struct MqttPublisher {
    client: Client,
    connection: Connection,
}

impl MqttPublisher {
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(CLIENT_ID, &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        if let Some(ca_file) = &config.ca_file {
            let ca = fs::read(ca_file)?;
            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }));
        }

        let (client, connection) = Client::new(options, 10);
        info!(host = %config.host, port = config.port, "connecting to mqtt broker");
        Ok(Self { client, connection })
    }

    pub fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        trace!(topic, payload, "publishing");
        self.client
            .publish(topic, QoS::AtMostOnce, false, Vec::from(payload))
            .map_err(|err| Error::Mqtt(err.to_string()))
    }

    /// Drain pending connection events without blocking the poll cadence.
    /// A connection error is fatal and stops the daemon loop.
    pub fn pump(&mut self) -> Result<()> {
        loop {
            match self.connection.recv_timeout(PUMP_TIMEOUT) {
                Ok(Ok(event)) => trace!(?event, "mqtt event"),
                Ok(Err(err)) => return Err(Error::Mqtt(err.to_string())),
                Err(_) => return Ok(()),
            }
        }
    }
}
