use super::types::{
    Capability, Provider, ProviderOptions, SpeechSegment, SynthesizedAudio, Transcription,
};
use crate::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Successful dispatch through a chain
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<O> {
    pub output: O,

    /// Provider that produced `output`
    pub served_by: String,

    /// Primary's failure when the fallback answered instead
    pub primary_failure: Option<ProviderError>,
}

/// Primary + optional fallback dispatch for one capability
///
/// On total failure the primary's error is surfaced, never the fallback's.
pub struct ProviderChain<I: ?Sized + Sync + 'static, O: Send + 'static> {
    capability: Capability,
    primary: Arc<dyn Provider<Input = I, Output = O>>,
    fallback: Option<Arc<dyn Provider<Input = I, Output = O>>>,
    /// Applied to each provider attempt independently
    timeout: Duration,
}

pub type TranscriptionChain = ProviderChain<SpeechSegment, Transcription>;
pub type SynthesisChain = ProviderChain<str, SynthesizedAudio>;

impl<I: ?Sized + Sync + 'static, O: Send + 'static> ProviderChain<I, O> {
    pub fn new(
        capability: Capability,
        primary: Arc<dyn Provider<Input = I, Output = O>>,
        fallback: Option<Arc<dyn Provider<Input = I, Output = O>>>,
        timeout: Duration,
    ) -> Self {
        Self {
            capability,
            primary,
            fallback,
            timeout,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&str> {
        self.fallback.as_ref().map(|p| p.name())
    }

    pub async fn dispatch(
        &self,
        input: &I,
        options: &ProviderOptions,
    ) -> Result<Dispatched<O>, ProviderError> {
        let primary_error = match self.attempt(self.primary.as_ref(), input, options).await {
            Ok(output) => {
                return Ok(Dispatched {
                    output,
                    served_by: self.primary.name().to_string(),
                    primary_failure: None,
                })
            }
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_error);
        };

        warn!(
            "{} primary {} failed ({}); trying fallback {}",
            self.capability,
            self.primary.name(),
            primary_error,
            fallback.name()
        );

        match self.attempt(fallback.as_ref(), input, options).await {
            Ok(output) => Ok(Dispatched {
                output,
                served_by: fallback.name().to_string(),
                primary_failure: Some(primary_error),
            }),
            Err(fallback_error) => {
                warn!(
                    "{} fallback {} also failed: {}",
                    self.capability,
                    fallback.name(),
                    fallback_error
                );
                Err(primary_error)
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn Provider<Input = I, Output = O>,
        input: &I,
        options: &ProviderOptions,
    ) -> Result<O, ProviderError> {
        match tokio::time::timeout(self.timeout, provider.call(input, options)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: provider.name().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
