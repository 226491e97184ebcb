//! One-call introspection entry point.

use crate::error::ProbeError;
use crate::models::{IntrospectionConfig, SchemaFilter, SchemaModel};
use crate::services::connector::Connector;
use crate::services::reader::SchemaReader;
use crate::services::strategy::Strategy;

/// Connects, reads the schema and closes the session in one run.
#[derive(Debug, Clone)]
pub struct Introspector {
    connector: Connector,
    reader: SchemaReader,
    filter: SchemaFilter,
}

impl Introspector {
    /// Create an introspector using the default strategy and the patterns
    /// from `config`.
    pub fn new(config: IntrospectionConfig) -> Self {
        let filter = SchemaFilter::from_config(&config);
        Self { connector: Connector::new(config), reader: SchemaReader::default(), filter }
    }

    /// Replace the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.reader = SchemaReader::new(strategy);
        self
    }

    /// Get the connector.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Get the filter derived from the configuration.
    pub fn filter(&self) -> &SchemaFilter {
        &self.filter
    }

    /// Run one introspection pass. The session is closed before returning.
    pub fn run(&self) -> Result<SchemaModel, ProbeError> {
        self.connector.with_connection(|handle| self.reader.read(handle, &self.filter))
    }
}

/// Introspect the database described by `config` with the default strategy.
pub fn introspect(config: IntrospectionConfig) -> Result<SchemaModel, ProbeError> {
    Introspector::new(config).run()
}
