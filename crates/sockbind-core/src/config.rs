//! Endpoint configuration: path template, subprotocols and codec registry.

use std::fmt;

use tracing::debug;

use crate::codec::{CodecRegistry, DecoderEntry, EncoderEntry, defaults};

/// Immutable configuration shared by every session of one endpoint.
///
/// Handler methods may declare an `Arc<EndpointConfig>` parameter to read
/// it during an invocation.
#[derive(Clone)]
pub struct EndpointConfig {
    path: String,
    subprotocols: Vec<String>,
    codecs: CodecRegistry,
}

impl EndpointConfig {
    /// Starts a builder for the endpoint mounted at `path`.
    #[must_use]
    pub fn builder(path: impl Into<String>) -> EndpointConfigBuilder {
        EndpointConfigBuilder {
            path: path.into(),
            subprotocols: Vec::new(),
            codecs: CodecRegistry::new(),
        }
    }

    /// Path template the endpoint is mounted at, e.g. `/chat/{room}`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Subprotocols offered during the handshake, in preference order.
    #[must_use]
    pub fn subprotocols(&self) -> &[String] {
        &self.subprotocols
    }

    /// Codec registrations, application adapters first.
    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("path", &self.path)
            .field("subprotocols", &self.subprotocols)
            .field("decoders", &self.codecs.decoders().len())
            .field("encoders", &self.codecs.encoders().len())
            .finish()
    }
}

/// Builder for [`EndpointConfig`].
///
/// [`build`](Self::build) appends the built-in codecs after whatever was
/// registered here, so application adapters always win lookup.
pub struct EndpointConfigBuilder {
    path: String,
    subprotocols: Vec<String>,
    codecs: CodecRegistry,
}

impl EndpointConfigBuilder {
    /// Offers a subprotocol during the handshake.
    #[must_use]
    pub fn subprotocol(mut self, name: impl Into<String>) -> Self {
        self.subprotocols.push(name.into());
        self
    }

    /// Registers a decoder.
    #[must_use]
    pub fn decoder(mut self, entry: DecoderEntry) -> Self {
        self.codecs.add_decoder(entry);
        self
    }

    /// Registers an encoder.
    #[must_use]
    pub fn encoder(mut self, entry: EncoderEntry) -> Self {
        self.codecs.add_encoder(entry);
        self
    }

    /// Finalizes the configuration.
    #[must_use]
    pub fn build(mut self) -> EndpointConfig {
        for entry in defaults::decoders() {
            self.codecs.add_decoder(entry);
        }
        for entry in defaults::encoders() {
            self.codecs.add_encoder(entry);
        }
        debug!(
            path = %self.path,
            decoders = self.codecs.decoders().len(),
            encoders = self.codecs.encoders().len(),
            "endpoint configuration built"
        );
        EndpointConfig {
            path: self.path,
            subprotocols: self.subprotocols,
            codecs: self.codecs,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
