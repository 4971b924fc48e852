use super::chain::{ProviderChain, SynthesisChain, TranscriptionChain};
use super::http::{HttpSynthesizer, HttpTranscriber};
use super::nats::NatsTranscriber;
use super::types::{Capability, Provider, Synthesizer, Transcriber};
use crate::config::{DispatchPolicy, ProviderConfig, ProviderKind};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Named providers, filled at startup and read-only afterwards
#[derive(Default)]
pub struct ProviderRegistry {
    transcribers: HashMap<String, Arc<Transcriber>>,
    synthesizers: HashMap<String, Arc<Synthesizer>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_transcriber(&mut self, provider: Arc<Transcriber>) -> Result<()> {
        let name = provider.name().to_string();
        if self.contains(&name) {
            bail!("Provider {} registered twice", name);
        }
        self.transcribers.insert(name, provider);
        Ok(())
    }

    pub fn register_synthesizer(&mut self, provider: Arc<Synthesizer>) -> Result<()> {
        let name = provider.name().to_string();
        if self.contains(&name) {
            bail!("Provider {} registered twice", name);
        }
        self.synthesizers.insert(name, provider);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transcribers.contains_key(name) || self.synthesizers.contains_key(name)
    }

    pub fn transcriber(&self, name: &str) -> Result<Arc<Transcriber>> {
        Self::resolve(
            &self.transcribers,
            self.synthesizers.contains_key(name),
            name,
            Capability::Transcribe,
        )
    }

    pub fn synthesizer(&self, name: &str) -> Result<Arc<Synthesizer>> {
        Self::resolve(
            &self.synthesizers,
            self.transcribers.contains_key(name),
            name,
            Capability::Synthesize,
        )
    }

    fn resolve<P: ?Sized>(
        providers: &HashMap<String, Arc<P>>,
        other_capability: bool,
        name: &str,
        capability: Capability,
    ) -> Result<Arc<P>> {
        match providers.get(name) {
            Some(provider) => Ok(Arc::clone(provider)),
            None if other_capability => {
                bail!("Provider {} cannot {}", name, capability)
            }
            None => bail!("Unknown {} provider: {}", capability, name),
        }
    }

    /// Build the transcription chain for a dispatch policy
    pub fn transcription_chain(
        &self,
        policy: &DispatchPolicy,
        timeout: Duration,
    ) -> Result<TranscriptionChain> {
        let primary = self.transcriber(&policy.primary)?;
        let fallback = policy
            .fallback
            .as_deref()
            .map(|name| self.transcriber(name))
            .transpose()?;

        Ok(ProviderChain::new(Capability::Transcribe, primary, fallback, timeout))
    }

    /// Build the synthesis chain for a dispatch policy
    pub fn synthesis_chain(
        &self,
        policy: &DispatchPolicy,
        timeout: Duration,
    ) -> Result<SynthesisChain> {
        let primary = self.synthesizer(&policy.primary)?;
        let fallback = policy
            .fallback
            .as_deref()
            .map(|name| self.synthesizer(name))
            .transpose()?;

        Ok(ProviderChain::new(Capability::Synthesize, primary, fallback, timeout))
    }
}

/// Builds providers from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub async fn build(configs: &[ProviderConfig]) -> Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();

        for cfg in configs {
            info!("Registering {} provider {}", cfg.capability, cfg.name);

            match (&cfg.kind, cfg.capability) {
                (
                    ProviderKind::Http {
                        base_url,
                        api_key,
                        model,
                        ..
                    },
                    Capability::Transcribe,
                ) => {
                    let provider =
                        HttpTranscriber::new(&cfg.name, base_url, api_key.clone(), model);
                    registry.register_transcriber(Arc::new(provider))?;
                }

                (
                    ProviderKind::Http {
                        base_url,
                        api_key,
                        model,
                        voice,
                        format,
                    },
                    Capability::Synthesize,
                ) => {
                    let provider = HttpSynthesizer::new(
                        &cfg.name,
                        base_url,
                        api_key.clone(),
                        model,
                        voice.clone(),
                        *format,
                    );
                    registry.register_synthesizer(Arc::new(provider))?;
                }

                (ProviderKind::Nats { url, subject }, Capability::Transcribe) => {
                    let provider = NatsTranscriber::connect(&cfg.name, url, subject).await?;
                    registry.register_transcriber(Arc::new(provider))?;
                }

                (ProviderKind::Nats { .. }, Capability::Synthesize) => {
                    bail!("Provider {}: NATS providers only support transcription", cfg.name)
                }
            }
        }

        Ok(registry)
    }
}
